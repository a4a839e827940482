//! # Service-control state machine.
//!
//! | State        | Event                                   | Action                              | Next         |
//! |--------------|-----------------------------------------|-------------------------------------|--------------|
//! | -            | `drive` invoked                         | report `StartPending`               | StartPending |
//! | StartPending | `start` ok                              | report `Running` (accepts stop)     | Running      |
//! | StartPending | `start` fails                           | report `Stopped` + code 1, `Err`    | -            |
//! | Running      | `Interrogate`                           | re-report current status            | Running      |
//! | Running      | `Stop` / `Shutdown` / shutdown signal   | report `StopPending`                | StopPending  |
//! | Running      | command stream closed                   | same as `Stop`                      | StopPending  |
//! | StopPending  | `stop` ok                               | report `Stopped`                    | Stopped      |
//! | StopPending  | `stop` fails                            | report `Stopped` + code 2, `Err`    | -            |
//!
//! ## Rules
//! - Every run ends with exactly one `Stopped` report, success or not.
//! - Status writes wait for channel space; they are never dropped or retried.
//! - `Service::stop` runs exactly once, between `StopPending` and `Stopped`.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{Command, Status};
use crate::{
    config::Config,
    error::{RunError, START_FAILURE_CODE, STOP_FAILURE_CODE},
    lifecycle::{Lifecycle, Phase},
    service::Service,
    shutdown::ShutdownSignal,
};

/// Drives a [`Service`] through the service-manager protocol.
///
/// # Example
/// ```
/// # use async_trait::async_trait;
/// # use svcrunner::{BoxError, Service};
/// # struct Echo;
/// # #[async_trait]
/// # impl Service for Echo {
/// #     fn name(&self) -> &str { "echo" }
/// #     async fn init(&self) -> Result<(), BoxError> { Ok(()) }
/// #     async fn start(&self) -> Result<(), BoxError> { Ok(()) }
/// #     async fn stop(&self) -> Result<(), BoxError> { Ok(()) }
/// # }
/// use svcrunner::{Config, ShutdownSignal};
/// use svcrunner::control::{Command, ControlStateMachine, ServiceState};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (cmd_tx, cmd_rx) = mpsc::channel(8);
/// let (status_tx, mut status_rx) = mpsc::channel(8);
///
/// cmd_tx.send(Command::Stop).await.unwrap();
/// ControlStateMachine::new(status_tx, &Config::default())
///     .drive(&Echo, cmd_rx, &ShutdownSignal::new())
///     .await
///     .unwrap();
///
/// let mut last = None;
/// while let Some(status) = status_rx.recv().await {
///     last = Some(status.state);
/// }
/// assert_eq!(last, Some(ServiceState::Stopped));
/// # }
/// ```
#[derive(Debug)]
pub struct ControlStateMachine {
    statuses: mpsc::Sender<Status>,
    current: Option<Status>,
    start_wait_hint: Duration,
    stop_wait_hint: Duration,
}

impl ControlStateMachine {
    /// Creates a machine reporting into `statuses`, with wait hints from `cfg`.
    pub fn new(statuses: mpsc::Sender<Status>, cfg: &Config) -> Self {
        Self {
            statuses,
            current: None,
            start_wait_hint: cfg.start_wait_hint,
            stop_wait_hint: cfg.stop_wait_hint,
        }
    }

    /// Runs `start`, serves commands until a stop request, then runs `stop`.
    ///
    /// The caller must already have run `init`. The status sender is dropped
    /// when this returns, closing the status stream.
    pub async fn drive<S: Service + ?Sized>(
        self,
        service: &S,
        commands: mpsc::Receiver<Command>,
        shutdown: &ShutdownSignal,
    ) -> Result<(), RunError> {
        let mut lifecycle = Lifecycle::at(Phase::Initialized);
        self.drive_from(service, commands, shutdown, &mut lifecycle).await
    }

    pub(crate) async fn drive_from<S: Service + ?Sized>(
        mut self,
        service: &S,
        mut commands: mpsc::Receiver<Command>,
        shutdown: &ShutdownSignal,
        lifecycle: &mut Lifecycle,
    ) -> Result<(), RunError> {
        self.report(Status::start_pending(self.start_wait_hint)).await;

        if let Err(err) = service.start().await {
            error!(error = %err, "service start failed");
            self.report(Status::stopped(Some(START_FAILURE_CODE))).await;
            return Err(RunError::Start(err));
        }
        lifecycle.advance(Phase::Running);
        self.report(Status::running()).await;

        self.serve_commands(&mut commands, shutdown).await;
        shutdown.trigger();

        lifecycle.advance(Phase::Stopping);
        self.report(Status::stop_pending(self.stop_wait_hint)).await;

        match service.stop().await {
            Ok(()) => {
                lifecycle.advance(Phase::Stopped);
                self.report(Status::stopped(None)).await;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "service stop failed");
                self.report(Status::stopped(Some(STOP_FAILURE_CODE))).await;
                Err(RunError::Stop(err))
            }
        }
    }

    /// Handles commands in `Running` until a stop request arrives.
    async fn serve_commands(&mut self, commands: &mut mpsc::Receiver<Command>, shutdown: &ShutdownSignal) {
        loop {
            let command = tokio::select! {
                _ = shutdown.triggered() => {
                    info!("stop requested");
                    return;
                }
                cmd = commands.recv() => cmd,
            };

            match command {
                Some(Command::Interrogate) => {
                    debug!("interrogate");
                    if let Some(current) = self.current {
                        self.report(current).await;
                    }
                }
                Some(cmd @ (Command::Stop | Command::Shutdown)) => {
                    info!(command = ?cmd, "stop requested by service manager");
                    return;
                }
                Some(Command::Other(code)) => {
                    debug!(code, "ignoring unsupported control command");
                }
                None => {
                    warn!("service manager command stream closed; stopping");
                    return;
                }
            }
        }
    }

    /// Records `status` as current and hands it to the manager.
    async fn report(&mut self, status: Status) {
        self.current = Some(status);
        debug!(state = %status.state, failure_code = ?status.failure_code, "report status");
        if self.statuses.send(status).await.is_err() {
            warn!(state = %status.state, "service manager no longer reads status reports");
        }
    }
}
