//! # OS termination signals.
//!
//! [`SignalSource`] is the seam between the runner and OS signal delivery.
//! [`OsSignals`] is the real implementation; tests plug in their own source to
//! simulate an interrupt without touching process-wide signal state.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ## Wait point
//! ```text
//! wait_for_stop(shutdown, signals):
//!   select! {
//!     shutdown.triggered()  ─► StopCause::Requested
//!     signals.recv()        ─► shutdown.trigger(); StopCause::Signal
//!   }
//!   (the losing branch is dropped, which deregisters the signal listeners)
//! ```

use std::fmt;

use async_trait::async_trait;
use tracing::{error, info};

use crate::shutdown::ShutdownSignal;

/// Source of "graceful shutdown requested by the OS or operator" events.
#[async_trait]
pub trait SignalSource: Send + Sync + 'static {
    /// Completes when a termination signal is received.
    ///
    /// Returns `Err` if the listeners cannot be installed.
    async fn recv(&self) -> std::io::Result<()>;
}

/// Termination signals delivered by the operating system.
///
/// Each call to [`recv`](SignalSource::recv) creates independent listeners.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

#[async_trait]
impl SignalSource for OsSignals {
    async fn recv(&self) -> std::io::Result<()> {
        wait_for_termination_signal().await
    }
}

/// Waits for SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// A source that never fires; used when signal handling is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

#[async_trait]
impl SignalSource for NoSignals {
    async fn recv(&self) -> std::io::Result<()> {
        std::future::pending().await
    }
}

/// What unblocked the wait point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The shutdown signal was triggered (programmatic stop or service manager).
    Requested,
    /// An OS termination signal arrived.
    Signal,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Requested => f.write_str("requested"),
            StopCause::Signal => f.write_str("os-signal"),
        }
    }
}

/// Blocks until `shutdown` is triggered or `signals` fires, whichever is first.
///
/// An OS signal also triggers `shutdown`, so every observer sees one stop
/// request. If the signal listeners cannot be installed the failure is logged
/// and the wait continues on `shutdown` alone.
pub async fn wait_for_stop(shutdown: &ShutdownSignal, signals: &dyn SignalSource) -> StopCause {
    let cause = tokio::select! {
        _ = shutdown.triggered() => StopCause::Requested,
        res = signals.recv() => match res {
            Ok(()) => StopCause::Signal,
            Err(err) => {
                error!(error = %err, "failed to install signal listeners; waiting for stop request only");
                shutdown.triggered().await;
                StopCause::Requested
            }
        },
    };
    shutdown.trigger();
    info!(%cause, "stop requested");
    cause
}
