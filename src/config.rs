//! # Runner configuration.
//!
//! [`Config`] gathers the few knobs a runner has. It is consumed by
//! [`default_runner`](crate::default_runner) and the concrete runners.
//!
//! ## Sentinel values
//! - `command_capacity = 0` / `status_capacity = 0` → clamped to 1
//! - `start_wait_hint = 0s` / `stop_wait_hint = 0s` → no hint reported

use std::time::Duration;

/// Runner configuration.
///
/// ## Field semantics
/// - `notify`: send readiness/stopping notifications when a supervisor socket is present
/// - `handle_signals`: treat SIGINT/SIGTERM (Ctrl-C on Windows) as a stop request
/// - `command_capacity`: service-manager command channel size (min 1)
/// - `status_capacity`: service-manager status channel size (min 1)
/// - `start_wait_hint` / `stop_wait_hint`: reported to the service manager with pending states
#[derive(Clone, Debug)]
pub struct Config {
    /// Notify the host supervisor (`NOTIFY_SOCKET`) on ready and stopping.
    pub notify: bool,

    /// Listen for OS termination signals.
    pub handle_signals: bool,

    /// Capacity of the command channel between the service manager callback and the state machine.
    pub command_capacity: usize,

    /// Capacity of the status channel between the state machine and the service manager.
    ///
    /// One run reports at most four state changes plus one re-report per
    /// `Interrogate`; the sender waits rather than dropping when the channel is full.
    pub status_capacity: usize,

    /// Wait hint reported with `StartPending`.
    pub start_wait_hint: Duration,

    /// Wait hint reported with `StopPending`.
    ///
    /// The service manager enforces its own stop timeout; the runner never does.
    pub stop_wait_hint: Duration,
}

impl Config {
    /// Returns the command channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Returns the status channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn status_capacity_clamped(&self) -> usize {
        self.status_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `notify = true`, `handle_signals = true`
    /// - `command_capacity = 8`, `status_capacity = 4`
    /// - `start_wait_hint = 10s`, `stop_wait_hint = 30s`
    fn default() -> Self {
        Self {
            notify: true,
            handle_signals: true,
            command_capacity: 8,
            status_capacity: 4,
            start_wait_hint: Duration::from_secs(10),
            stop_wait_hint: Duration::from_secs(30),
        }
    }
}
