//! # Service contract.
//!
//! [`Service`] is the only extension point of the crate: the application being
//! supervised implements it and hands a reference to [`run`](crate::run).
//!
//! ## Call order
//! ```text
//! name()  ── any time, pure
//! init()  ──► start() ──► (wait for stop request) ──► stop()
//!   │            │                                       │
//!   └─ Err: run aborts, nothing else is called           └─ Err: reported, aggregated
//!                └─ Err: run aborts, stop() is not called
//! ```
//!
//! Each lifecycle method is called at most once per run, sequentially, never
//! concurrently with another one. The runner only borrows the service, so an
//! implementation may itself borrow data that outlives the run.

use async_trait::async_trait;

use crate::error::BoxError;

/// # Lifecycle contract of a supervised service.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use svcrunner::{BoxError, Service};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Service for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn init(&self) -> Result<(), BoxError> { Ok(()) }
///
///     async fn start(&self) -> Result<(), BoxError> {
///         // spawn workers and return
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), BoxError> {
///         // signal workers and wait for them
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync {
    /// Short descriptive name; used as the service-manager registration name.
    fn name(&self) -> &str;

    /// Prepares the service. Runs before [`start`](Service::start).
    async fn init(&self) -> Result<(), BoxError>;

    /// Begins active work and returns once the service is operational.
    ///
    /// Must not run the main loop inline: spawn it and return.
    async fn start(&self) -> Result<(), BoxError>;

    /// Shuts the service down, returning once shutdown is complete.
    ///
    /// Under the Windows service manager this must finish within the manager's
    /// own service-stop timeout.
    async fn stop(&self) -> Result<(), BoxError>;
}
