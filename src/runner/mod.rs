//! # Runners: one lifecycle, one implementation per host environment.
//!
//! ```text
//! run(&service)
//!   ├─► ShutdownSignal::new()  + register as target of svcrunner::stop()
//!   ├─► default_runner(Config)
//!   │     ├─ unix    → ForegroundRunner      (NOTIFY_SOCKET + SIGINT/SIGTERM)
//!   │     └─ windows → ServiceManagerRunner  (service manager, or interactive Ctrl-C)
//!   ├─► Runner::run(service, &shutdown)      (inside span "service")
//!   └─► deregister + trigger shutdown        (every path)
//! ```
//!
//! Runners can also be driven directly with a caller-owned [`ShutdownSignal`];
//! that bypasses the process-wide [`stop`](crate::stop) holder.

mod foreground;
#[cfg(windows)]
mod service_manager;

use async_trait::async_trait;
use tracing::{Instrument, info_span};

pub use foreground::ForegroundRunner;
#[cfg(windows)]
pub use service_manager::ServiceManagerRunner;

use crate::{
    config::Config,
    error::RunError,
    service::Service,
    shutdown::{Registration, ShutdownSignal},
};

/// Runs one service through its whole lifecycle in a given host environment.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Runs `service` until it is stopped; `shutdown` is the run's stop trigger.
    ///
    /// Returns once `stop` has completed, or as soon as a fatal phase fails.
    async fn run(&self, service: &dyn Service, shutdown: &ShutdownSignal) -> Result<(), RunError>;
}

/// Returns the runner for the platform this crate was built for.
#[cfg(not(windows))]
pub fn default_runner(cfg: Config) -> Box<dyn Runner> {
    Box::new(ForegroundRunner::new(&cfg))
}

/// Returns the runner for the platform this crate was built for.
#[cfg(windows)]
pub fn default_runner(cfg: Config) -> Box<dyn Runner> {
    Box::new(ServiceManagerRunner::new(cfg))
}

/// Runs `service` with the platform's default runner and configuration.
///
/// Blocks (asynchronously) until the service has been stopped by an OS
/// signal, the service manager, or [`stop`](crate::stop).
///
/// # Errors
/// Any [`RunError`]; the process should exit non-zero.
pub async fn run<S: Service>(service: &S) -> Result<(), RunError> {
    let runner = default_runner(Config::default());
    run_with(service, runner.as_ref()).await
}

/// Runs `service` with an explicit runner.
///
/// Registers a fresh [`ShutdownSignal`] as the target of [`stop`](crate::stop)
/// for the duration of the call. Fails with [`RunError::AlreadyRunning`] if
/// another run is active in this process.
pub async fn run_with(service: &dyn Service, runner: &dyn Runner) -> Result<(), RunError> {
    let shutdown = ShutdownSignal::new();
    let _registration = Registration::acquire(&shutdown)?;

    let span = info_span!("service", name = service.name());
    runner.run(service, &shutdown).instrument(span).await
}
