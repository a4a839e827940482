//! # svcrunner
//!
//! **svcrunner** runs one async service as a long-running background process
//! under the host's service supervisor: a systemd-style init system on Unix,
//! or the service-control manager on Windows.
//!
//! The application implements [`Service`] (`name`, `init`, `start`, `stop`);
//! the runner sequences the lifecycle and turns every kind of stop request
//! into one [`ShutdownSignal`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────────────────────┐
//!     │   Service (user-supplied)    │
//!     │   name / init / start / stop │
//!     └──────────────┬───────────────┘
//!                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  run(&service)                                                    │
//! │  - ShutdownSignal (one per run, target of svcrunner::stop())      │
//! │  - default_runner(Config) → Box<dyn Runner>                       │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        ▼ unix                                             ▼ windows
//! ┌──────────────────────────────┐        ┌──────────────────────────────────┐
//! │  ForegroundRunner            │        │  ServiceManagerRunner            │
//! │  - Notifier (NOTIFY_SOCKET)  │        │  - probe: managed or console?    │
//! │  - SignalSource (INT/TERM)   │        │  - managed: ControlStateMachine  │
//! └──────────────────────────────┘        │  - console: ForegroundRunner     │
//!                                         └──────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! init() ─► start() ─► notify READY ─► wait ─► notify STOPPING ─► stop()
//!   │          │                        │
//!   │          │                        └─ first of: SIGINT/SIGTERM, manager Stop/Shutdown, svcrunner::stop()
//!   │          └─ Err ─► RunError::Start (stop() is not called)
//!   └─ Err ─► RunError::Init (nothing else is called, no notifications)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / functions                       |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Contract**      | What a supervised application implements.                    | [`Service`]                                 |
//! | **Running**       | Run a service with the platform's runner.                    | [`run`], [`run_with`], [`Runner`]           |
//! | **Stopping**      | Request shutdown from inside the process.                    | [`stop`], [`ShutdownSignal`]                |
//! | **Notifications** | Readiness/stopping reports to a host supervisor.             | [`notify::Notifier`], [`notify::SystemdSource`] |
//! | **Service manager** | Command/status state machine, testable without Windows.   | [`control::ControlStateMachine`]            |
//! | **Errors**        | Phase-tagged errors with aggregation.                        | [`RunError`]                                |
//! | **Configuration** | Runner knobs.                                                | [`Config`]                                  |
//!
//! ## Example
//! ```rust,no_run
//! use async_trait::async_trait;
//! use svcrunner::{BoxError, Service};
//!
//! struct Worker;
//!
//! #[async_trait]
//! impl Service for Worker {
//!     fn name(&self) -> &str { "worker" }
//!     async fn init(&self) -> Result<(), BoxError> { Ok(()) }
//!     async fn start(&self) -> Result<(), BoxError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     svcrunner::run(&Worker).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod lifecycle;
mod runner;
mod service;
mod shutdown;

pub mod control;
pub mod notify;
pub mod signals;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{BoxError, RunError, START_FAILURE_CODE, STOP_FAILURE_CODE};
pub use lifecycle::Phase;
pub use runner::{ForegroundRunner, Runner, default_runner, run, run_with};
pub use service::Service;
pub use shutdown::{ShutdownSignal, stop};

#[cfg(windows)]
pub use runner::ServiceManagerRunner;
