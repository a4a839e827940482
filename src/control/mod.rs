//! # Service-control protocol: commands in, statuses out.
//!
//! A native service-control manager drives a service through an explicit
//! state machine. This module models that protocol independently of any OS
//! callback mechanism so it can be fed a synthetic command stream.
//!
//! ## Contents
//! - [`Command`] control requests delivered by the manager
//! - [`ServiceState`], [`Status`] what the service reports back
//! - [`ControlStateMachine`] the state machine driving a [`Service`](crate::Service)
//!
//! ## Wiring
//! ```text
//!   manager callback ──Command──► mpsc (bounded) ──► ControlStateMachine::drive
//!                                                          │
//!   manager status   ◄──Status─── mpsc (bounded) ◄─────────┘
//! ```
//!
//! The Windows transport lives in `runner::service_manager`; everything here
//! is platform-neutral.

mod machine;

use std::fmt;
use std::time::Duration;

pub use machine::ControlStateMachine;

/// Control request from the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Report the current status again.
    Interrogate,
    /// Stop the service.
    Stop,
    /// The system is shutting down; stop the service.
    Shutdown,
    /// Any other control code; ignored.
    Other(u32),
}

/// State reported to the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// `start` is in progress.
    StartPending,
    /// The service is running and accepts Stop/Shutdown.
    Running,
    /// `stop` is in progress.
    StopPending,
    /// The service has stopped (successfully or with a failure code).
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceState::StartPending => "start-pending",
            ServiceState::Running => "running",
            ServiceState::StopPending => "stop-pending",
            ServiceState::Stopped => "stopped",
        })
    }
}

/// One status report.
///
/// ## Field semantics
/// - `accepts_stop`: the service accepts Stop and Shutdown (only while `Running`)
/// - `failure_code`: service-specific exit code, set only on a failed `Stopped`
/// - `wait_hint`: expected duration of a pending state (`0s` = none)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Reported state.
    pub state: ServiceState,
    /// Whether Stop/Shutdown commands are accepted.
    pub accepts_stop: bool,
    /// Service-specific failure code for an abnormal stop.
    pub failure_code: Option<u32>,
    /// Expected duration of a pending state.
    pub wait_hint: Duration,
}

impl Status {
    /// `StartPending` with the given wait hint.
    pub fn start_pending(wait_hint: Duration) -> Self {
        Self {
            state: ServiceState::StartPending,
            accepts_stop: false,
            failure_code: None,
            wait_hint,
        }
    }

    /// `Running`, accepting Stop and Shutdown.
    pub fn running() -> Self {
        Self {
            state: ServiceState::Running,
            accepts_stop: true,
            failure_code: None,
            wait_hint: Duration::ZERO,
        }
    }

    /// `StopPending` with the given wait hint.
    pub fn stop_pending(wait_hint: Duration) -> Self {
        Self {
            state: ServiceState::StopPending,
            accepts_stop: false,
            failure_code: None,
            wait_hint,
        }
    }

    /// `Stopped`, optionally carrying a failure code.
    pub fn stopped(failure_code: Option<u32>) -> Self {
        Self {
            state: ServiceState::Stopped,
            accepts_stop: false,
            failure_code,
            wait_hint: Duration::ZERO,
        }
    }
}
