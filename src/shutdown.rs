//! # One-shot shutdown trigger.
//!
//! [`ShutdownSignal`] is the single cancellation event of a run. Every stop
//! source fires the same signal:
//!
//! ```text
//!   OS signal (SIGINT/SIGTERM/Ctrl-C) ──┐
//!   service-manager Stop / Shutdown  ───┼──► ShutdownSignal::trigger() ──► wait point unblocks
//!   svcrunner::stop()                ───┘        (idempotent, race-free)
//! ```
//!
//! ## Rules
//! - Triggering is **idempotent**: the first trigger wins, the rest are no-ops.
//! - Triggering is **race-free**: it is a `CancellationToken` cancel, an atomic close-once.
//! - Each top-level run owns a fresh signal; it is registered as the target of
//!   [`stop`] for the duration of the run and triggered again when the run ends,
//!   so no waiter is ever left dangling.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::RunError;

/// Target of [`stop`] while a top-level run is active.
static ACTIVE: Mutex<Option<ShutdownSignal>> = Mutex::new(None);

/// Cloneable handle to a run's cancellation event.
///
/// # Example
/// ```
/// use svcrunner::ShutdownSignal;
///
/// let signal = ShutdownSignal::new();
/// let remote = signal.clone();
///
/// remote.trigger();
/// remote.trigger(); // no-op
/// assert!(signal.is_triggered());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Safe to call any number of times from any thread.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the signal is triggered (immediately if it already was).
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Returns a child token that is cancelled together with this signal.
    ///
    /// Services that want to observe shutdown cooperatively can hand this to
    /// their own workers; cancelling the child does not trigger the signal.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

/// Requests shutdown of the active top-level run.
///
/// Does nothing when no run is active. Never blocks, never fails, and calling
/// it more than once is equivalent to calling it once.
pub fn stop() {
    if let Some(signal) = lock_active().as_ref() {
        tracing::debug!("programmatic stop requested");
        signal.trigger();
    }
}

/// Keeps `signal` registered as the target of [`stop`] until dropped.
///
/// Dropping the registration clears the holder and triggers the signal.
#[derive(Debug)]
pub(crate) struct Registration {
    signal: ShutdownSignal,
}

impl Registration {
    /// Registers `signal` as the process-wide [`stop`] target.
    ///
    /// Fails with [`RunError::AlreadyRunning`] if another run holds the slot.
    pub(crate) fn acquire(signal: &ShutdownSignal) -> Result<Self, RunError> {
        let mut active = lock_active();
        if active.is_some() {
            return Err(RunError::AlreadyRunning);
        }
        *active = Some(signal.clone());
        Ok(Self {
            signal: signal.clone(),
        })
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock_active().take();
        self.signal.trigger();
    }
}

/// The holder only ever stores a token, so a poisoned lock is still usable.
fn lock_active() -> MutexGuard<'static, Option<ShutdownSignal>> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serial_test::serial;

    use super::*;

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        signal.trigger();
        signal.trigger();

        assert!(signal.is_triggered());
        tokio::time::timeout(Duration::from_millis(100), signal.triggered())
            .await
            .expect("triggered() must complete once fired");
    }

    #[tokio::test]
    async fn test_concurrent_triggers() {
        let signal = ShutdownSignal::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let s = signal.clone();
            handles.push(tokio::spawn(async move { s.trigger() }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_child_token_follows_signal() {
        let signal = ShutdownSignal::new();
        let child = signal.child_token();
        child.cancel();
        assert!(!signal.is_triggered());

        let child = signal.child_token();
        signal.trigger();
        assert!(child.is_cancelled());
    }

    #[test]
    #[serial]
    fn test_stop_without_active_run_is_noop() {
        stop();
        stop();
    }

    #[test]
    #[serial]
    fn test_registration_routes_stop_and_clears() {
        let signal = ShutdownSignal::new();
        let reg = Registration::acquire(&signal).unwrap();

        let other = ShutdownSignal::new();
        assert!(matches!(
            Registration::acquire(&other),
            Err(RunError::AlreadyRunning)
        ));

        stop();
        assert!(signal.is_triggered());

        drop(reg);
        assert!(lock_active().is_none());

        // A fresh run can register again, and the old signal is not its target.
        let next = ShutdownSignal::new();
        let _reg = Registration::acquire(&next).unwrap();
        assert!(!next.is_triggered());
    }

    #[test]
    #[serial]
    fn test_drop_triggers_signal() {
        let signal = ShutdownSignal::new();
        {
            let _reg = Registration::acquire(&signal).unwrap();
        }
        assert!(signal.is_triggered());
    }
}
