//! # Readiness notifications to a host supervisor.
//!
//! The runner reports two events to the supervisor that launched it:
//! [`Notification::Ready`] once `start` succeeded and [`Notification::Stopping`]
//! right before `stop`. Both are best-effort; a write failure is logged, never
//! surfaced as a run failure.
//!
//! ## Contents
//! - [`Notifier`] an open notification channel (notify + close)
//! - [`NotifierSource`] how a runner acquires its channel at the start of a run
//! - [`SystemdSource`] / [`SystemdNotifier`] the `NOTIFY_SOCKET` datagram protocol
//! - [`NoNotifier`] a source that never finds a supervisor
//!
//! ## Absence is not an error
//! A source returns `Ok(None)` when no supervisor is configured. The runner
//! additionally tolerates `io::ErrorKind::NotFound` (socket path advertised
//! but missing); every other acquisition error is fatal.

mod systemd;

use std::fmt;
use std::io;

use async_trait::async_trait;

pub use systemd::SystemdSource;
#[cfg(unix)]
pub use systemd::SystemdNotifier;

/// Lifecycle events reported to the host supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The service finished starting and is ready to receive work.
    Ready,
    /// The service is beginning its shutdown.
    Stopping,
}

impl Notification {
    /// Wire form in the supervisor's key/value protocol.
    pub fn as_state(self) -> &'static str {
        match self {
            Notification::Ready => "READY=1",
            Notification::Stopping => "STOPPING=1",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_state())
    }
}

/// An open channel to the host supervisor.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification.
    async fn notify(&self, notification: Notification) -> io::Result<()>;

    /// Releases the channel. Called exactly once, at the end of the run.
    async fn close(&self) -> io::Result<()>;
}

/// Acquires a [`Notifier`] at the start of a run.
#[async_trait]
pub trait NotifierSource: Send + Sync + 'static {
    /// Returns `Ok(None)` when no supervisor is configured.
    async fn connect(&self) -> io::Result<Option<Box<dyn Notifier>>>;
}

/// A source for environments without a supervisor channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotifier;

#[async_trait]
impl NotifierSource for NoNotifier {
    async fn connect(&self) -> io::Result<Option<Box<dyn Notifier>>> {
        Ok(None)
    }
}
