//! # Lifecycle phases of one run.
//!
//! ```text
//! Uninitialized ──init──► Initialized ──start──► Running ──stop requested──► Stopping ──stop──► Stopped
//! ```
//!
//! Transitions are strictly linear. A failed `init`, `start` or `stop` leaves
//! the phase where it was; the runner never forces the skipped transition.

use std::fmt;

use tracing::info;

/// Phase of the supervised service within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Nothing has been called yet.
    Uninitialized,
    /// `init` succeeded.
    Initialized,
    /// `start` succeeded; waiting for a stop request.
    Running,
    /// A stop request was accepted; `stop` is about to run or running.
    Stopping,
    /// `stop` succeeded.
    Stopped,
}

impl Phase {
    /// The only phase reachable from `self`, if any.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Uninitialized => Some(Phase::Initialized),
            Phase::Initialized => Some(Phase::Running),
            Phase::Running => Some(Phase::Stopping),
            Phase::Stopping => Some(Phase::Stopped),
            Phase::Stopped => None,
        }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initialized => "initialized",
            Phase::Running => "running",
            Phase::Stopping => "stopping",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Tracks the phase of one run and logs every transition.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
        }
    }

    /// Resumes tracking at `phase`, for callers that ran the earlier steps themselves.
    pub(crate) fn at(phase: Phase) -> Self {
        Self { phase }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Moves to `to`, which must be the direct successor of the current phase.
    pub(crate) fn advance(&mut self, to: Phase) {
        debug_assert_eq!(
            self.phase.next(),
            Some(to),
            "illegal lifecycle transition {} -> {}",
            self.phase,
            to
        );
        info!(from = %self.phase, to = %to, "lifecycle transition");
        self.phase = to;
    }
}
