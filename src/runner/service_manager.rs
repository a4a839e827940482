//! # Windows service-manager runner.
//!
//! ## Flow
//! ```text
//! is_running_as_windows_service()         Err → EnvironmentProbe
//!   │
//!   ├─ managed:     chdir(exe dir) ─► init() ─► dispatcher thread + ControlStateMachine
//!   └─ interactive:                   init() ─► ForegroundRunner::serve (Ctrl-C / stop())
//! ```
//!
//! ## Rules
//! - The working directory changes strictly before `init`, and only when managed.
//! - The control handler never blocks: a full command queue drops `Interrogate`
//!   and turns `Stop`/`Shutdown` into a direct shutdown trigger.
//!
//! ## Transport bridge
//! ```text
//!  dispatcher thread (service_dispatcher::start)
//!    └─► service_main ── takes Bridge ──► register control handler
//!          handler:  ServiceControl ──try_send──► commands ──► ControlStateMachine
//!          loop:     statuses ──blocking_recv──► set_service_status   (until Stopped)
//! ```
//!
//! `service_main` is called by the OS through a plain function pointer, so the
//! channel ends are handed over through a process-wide slot.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use windows_service::{
    define_windows_service,
    service::{
        ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState as WinState,
        ServiceStatus, ServiceType,
    },
    service_control_handler::{self, ServiceControlHandlerResult},
    service_dispatcher,
};

use super::{ForegroundRunner, Runner};
use crate::{
    config::Config,
    control::{Command, ControlStateMachine, ServiceState, Status},
    error::RunError,
    lifecycle::{Lifecycle, Phase},
    service::Service,
    shutdown::ShutdownSignal,
};

/// Channel ends handed from the runner to `service_main`.
static BRIDGE: Mutex<Option<Bridge>> = Mutex::new(None);

struct Bridge {
    name: String,
    commands: mpsc::Sender<Command>,
    statuses: mpsc::Receiver<Status>,
    shutdown: ShutdownSignal,
}

/// Runner for the Windows service-control manager, with a console fallback.
pub struct ServiceManagerRunner {
    cfg: Config,
    interactive: ForegroundRunner,
}

impl ServiceManagerRunner {
    /// Creates a runner; the console fallback honours `cfg.handle_signals`.
    pub fn new(cfg: Config) -> Self {
        let interactive = ForegroundRunner::interactive(&cfg);
        Self { cfg, interactive }
    }

    async fn run_managed(
        &self,
        service: &dyn Service,
        shutdown: &ShutdownSignal,
        lifecycle: &mut Lifecycle,
    ) -> Result<(), RunError> {
        let (cmd_tx, cmd_rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        let (status_tx, status_rx) = mpsc::channel(self.cfg.status_capacity_clamped());
        let name = service.name().to_owned();

        *lock_bridge() = Some(Bridge {
            name: name.clone(),
            commands: cmd_tx,
            statuses: status_rx,
            shutdown: shutdown.clone(),
        });

        let mut dispatcher =
            tokio::task::spawn_blocking(move || service_dispatcher::start(name, ffi_service_main));

        let machine = ControlStateMachine::new(status_tx, &self.cfg);
        let drive = machine.drive_from(service, cmd_rx, shutdown, lifecycle);
        tokio::pin!(drive);

        let (outcome, dispatched) = tokio::select! {
            outcome = &mut drive => (outcome, (&mut dispatcher).await),
            dispatched = &mut dispatcher => {
                // The dispatcher is gone; closing the bridge ends the command stream.
                lock_bridge().take();
                (drive.await, dispatched)
            }
        };
        lock_bridge().take();

        let dispatched = match dispatched {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(RunError::Dispatcher(Box::new(err))),
            Err(join) => Err(RunError::Dispatcher(Box::new(join))),
        };
        RunError::aggregate(outcome, dispatched)
    }
}

#[async_trait]
impl Runner for ServiceManagerRunner {
    async fn run(&self, service: &dyn Service, shutdown: &ShutdownSignal) -> Result<(), RunError> {
        let mut lifecycle = Lifecycle::new();
        let managed = prepare(service, &mut lifecycle, probe_environment, enter_executable_dir).await?;

        if managed {
            self.run_managed(service, shutdown, &mut lifecycle).await
        } else {
            self.interactive
                .serve(service, shutdown, &mut lifecycle, None)
                .await
        }
    }
}

/// Probes the host, enters the executable's directory when managed, then runs `init`.
///
/// Returns whether the process runs under the service manager.
async fn prepare(
    service: &dyn Service,
    lifecycle: &mut Lifecycle,
    probe: impl FnOnce() -> io::Result<bool> + Send,
    enter_dir: impl FnOnce() -> Result<(), RunError> + Send,
) -> Result<bool, RunError> {
    let managed = probe().map_err(RunError::EnvironmentProbe)?;
    info!(managed, "service environment probed");

    if managed {
        enter_dir()?;
    }

    if let Err(err) = service.init().await {
        error!(error = %err, "service init failed");
        return Err(RunError::Init(err));
    }
    lifecycle.advance(Phase::Initialized);
    Ok(managed)
}

fn probe_environment() -> io::Result<bool> {
    windows_service_detector::is_running_as_windows_service().map_err(io::Error::from)
}

/// Changes into the directory holding the running executable.
fn enter_executable_dir() -> Result<(), RunError> {
    let exe = std::env::current_exe().map_err(|source| RunError::WorkingDirectory {
        path: PathBuf::new(),
        source,
    })?;
    let dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
    std::env::set_current_dir(&dir).map_err(|source| RunError::WorkingDirectory {
        path: dir.clone(),
        source,
    })?;
    debug!(dir = %dir.display(), "changed working directory");
    Ok(())
}

fn lock_bridge() -> std::sync::MutexGuard<'static, Option<Bridge>> {
    BRIDGE.lock().unwrap_or_else(PoisonError::into_inner)
}

define_windows_service!(ffi_service_main, service_main);

fn service_main(_arguments: Vec<OsString>) {
    let Some(bridge) = lock_bridge().take() else {
        error!("service manager started the service without a runner bridge");
        return;
    };
    if let Err(err) = serve_bridge(bridge) {
        error!(error = %err, "service manager bridge failed");
    }
}

/// Forwards commands to the state machine and statuses to the manager until `Stopped`.
fn serve_bridge(bridge: Bridge) -> windows_service::Result<()> {
    let Bridge {
        name,
        commands,
        mut statuses,
        shutdown,
    } = bridge;

    let handle = service_control_handler::register(&name, move |control| {
        let command = match control {
            ServiceControl::Interrogate => Command::Interrogate,
            ServiceControl::Stop => Command::Stop,
            ServiceControl::Shutdown => Command::Shutdown,
            _ => return ServiceControlHandlerResult::NotImplemented,
        };
        forward(&commands, &shutdown, command);
        ServiceControlHandlerResult::NoError
    })?;

    while let Some(status) = statuses.blocking_recv() {
        handle.set_service_status(to_service_status(&status))?;
        if status.state == ServiceState::Stopped {
            return Ok(());
        }
    }

    // The state machine went away without reporting Stopped.
    handle.set_service_status(to_service_status(&Status::stopped(None)))
}

/// Hands `command` to the state machine without blocking the handler thread.
fn forward(commands: &mpsc::Sender<Command>, shutdown: &ShutdownSignal, command: Command) {
    match commands.try_send(command) {
        Ok(()) => {}
        Err(TrySendError::Full(cmd @ (Command::Stop | Command::Shutdown))) => {
            debug!(command = ?cmd, "command queue full; triggering shutdown directly");
            shutdown.trigger();
        }
        Err(TrySendError::Full(cmd)) => {
            debug!(command = ?cmd, "command queue full; manager keeps the last status");
        }
        Err(TrySendError::Closed(cmd)) => {
            warn!(command = ?cmd, "state machine finished; dropping control command");
        }
    }
}

fn to_service_status(status: &Status) -> ServiceStatus {
    let current_state = match status.state {
        ServiceState::StartPending => WinState::StartPending,
        ServiceState::Running => WinState::Running,
        ServiceState::StopPending => WinState::StopPending,
        ServiceState::Stopped => WinState::Stopped,
    };
    let controls_accepted = if status.accepts_stop {
        ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN
    } else {
        ServiceControlAccept::empty()
    };
    let exit_code = match status.failure_code {
        Some(code) => ServiceExitCode::ServiceSpecific(code),
        None => ServiceExitCode::Win32(0),
    };

    ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state,
        controls_accepted,
        exit_code,
        checkpoint: 0,
        wait_hint: status.wait_hint,
        process_id: None,
    }
}
