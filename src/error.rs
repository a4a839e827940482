//! # Errors produced while running a service.
//!
//! [`RunError`] is the single error type returned by [`run`](crate::run) and
//! every [`Runner`](crate::Runner). Each variant is tagged with the lifecycle
//! phase (or the piece of host plumbing) that produced it, so an `init`
//! failure is never confused with a `stop` failure in logs.
//!
//! ## Propagation rules
//! - `Init` / `Start` are fatal and short-circuit the lifecycle.
//! - `Stop` and `NotifierTeardown` may both happen on the way out; they are
//!   combined into [`RunError::Multiple`] so neither is lost.
//! - `NotifierSetup` is only produced for real failures; a missing supervisor
//!   socket is tolerated by the runner and never reaches this type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by [`Service`](crate::Service) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure code reported to the service manager when `start` fails.
pub const START_FAILURE_CODE: u32 = 1;

/// Failure code reported to the service manager when `stop` fails.
pub const STOP_FAILURE_CODE: u32 = 2;

/// # Errors produced by a service run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// [`Service::init`](crate::Service::init) failed.
    #[error("service/init: {0}")]
    Init(#[source] BoxError),

    /// [`Service::start`](crate::Service::start) failed.
    #[error("service/start: {0}")]
    Start(#[source] BoxError),

    /// [`Service::stop`](crate::Service::stop) failed.
    #[error("service/stop: {0}")]
    Stop(#[source] BoxError),

    /// The supervisor notification channel exists but could not be opened.
    #[error("notify/setup: {0}")]
    NotifierSetup(#[source] io::Error),

    /// The supervisor notification channel could not be released.
    #[error("notify/teardown: {0}")]
    NotifierTeardown(#[source] io::Error),

    /// Could not determine whether the process runs under the service manager.
    #[error("service-manager/probe: {0}")]
    EnvironmentProbe(#[source] io::Error),

    /// Could not change into the executable's directory before `init`.
    #[error("service-manager/chdir {}: {source}", path.display())]
    WorkingDirectory {
        /// Directory the runner tried to enter.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The service manager dispatcher refused to run the service.
    #[error("service-manager/dispatch: {0}")]
    Dispatcher(#[source] BoxError),

    /// Another top-level run is already active in this process.
    #[error("a service run is already active in this process")]
    AlreadyRunning,

    /// Several shutdown-path failures; none of them is discarded.
    #[error("{}", join_messages(.0))]
    Multiple(Vec<RunError>),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use svcrunner::RunError;
    ///
    /// let err = RunError::Init("disk full".into());
    /// assert_eq!(err.as_label(), "service_init");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Init(_) => "service_init",
            RunError::Start(_) => "service_start",
            RunError::Stop(_) => "service_stop",
            RunError::NotifierSetup(_) => "notifier_setup",
            RunError::NotifierTeardown(_) => "notifier_teardown",
            RunError::EnvironmentProbe(_) => "environment_probe",
            RunError::WorkingDirectory { .. } => "working_directory",
            RunError::Dispatcher(_) => "dispatcher",
            RunError::AlreadyRunning => "already_running",
            RunError::Multiple(_) => "multiple",
        }
    }

    /// Service-specific code reported to the service manager, if this error has one.
    ///
    /// For [`RunError::Multiple`] the first error carrying a code wins.
    pub fn failure_code(&self) -> Option<u32> {
        match self {
            RunError::Start(_) => Some(START_FAILURE_CODE),
            RunError::Stop(_) => Some(STOP_FAILURE_CODE),
            RunError::Multiple(errs) => errs.iter().find_map(RunError::failure_code),
            _ => None,
        }
    }

    /// Iterates over the individual errors, flattening [`RunError::Multiple`].
    pub fn errors(&self) -> Box<dyn Iterator<Item = &RunError> + '_> {
        match self {
            RunError::Multiple(errs) => Box::new(errs.iter().flat_map(RunError::errors)),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Combines two outcomes so that neither failure is discarded.
    ///
    /// # Example
    /// ```
    /// use std::io;
    /// use svcrunner::RunError;
    ///
    /// let stop = Err(RunError::Stop("flush failed".into()));
    /// let teardown = Err(RunError::NotifierTeardown(io::Error::other("socket")));
    ///
    /// let err = RunError::aggregate(stop, teardown).unwrap_err();
    /// assert_eq!(err.errors().count(), 2);
    /// ```
    pub fn aggregate(first: Result<(), RunError>, second: Result<(), RunError>) -> Result<(), RunError> {
        match (first, second) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(a), Err(b)) => {
                let mut all = Vec::new();
                for e in [a, b] {
                    match e {
                        RunError::Multiple(inner) => all.extend(inner),
                        other => all.push(other),
                    }
                }
                Err(RunError::Multiple(all))
            }
        }
    }
}

fn join_messages(errs: &[RunError]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
