//! # Foreground runner: readiness notifications + OS signals.
//!
//! Used directly under systemd-style supervisors, and as the interactive
//! fallback of the service-manager runner.
//!
//! ## Flow
//! ```text
//! notifier = source.connect()            None / NotFound → run without notifier
//!   │                                     other error     → NotifierSetup (abort)
//! init()  ──Err──► close notifier ─► Init
//! start() ──Err──► close notifier ─► Start
//! notify(Ready)                          best-effort
//! wait_for_stop(shutdown, signals)       first of: stop request / OS signal
//! notify(Stopping)                       best-effort
//! stop()                                 error kept
//! close notifier                         error aggregated with stop error
//! ```

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::Runner;
use crate::{
    config::Config,
    error::RunError,
    lifecycle::{Lifecycle, Phase},
    notify::{NoNotifier, Notification, Notifier, NotifierSource, SystemdSource},
    service::Service,
    shutdown::ShutdownSignal,
    signals::{NoSignals, OsSignals, SignalSource, wait_for_stop},
};

/// Runner for supervisors that expect readiness notifications and signal-driven shutdown.
///
/// # Example
/// ```
/// use svcrunner::{Config, ForegroundRunner};
/// use svcrunner::notify::NoNotifier;
///
/// let runner = ForegroundRunner::new(&Config::default()).with_notifier(NoNotifier);
/// # let _ = runner;
/// ```
#[derive(Clone)]
pub struct ForegroundRunner {
    notifier: Arc<dyn NotifierSource>,
    signals: Arc<dyn SignalSource>,
}

impl ForegroundRunner {
    /// Builds a runner from `cfg`: `NOTIFY_SOCKET` notifier if `cfg.notify`,
    /// OS signals if `cfg.handle_signals`.
    pub fn new(cfg: &Config) -> Self {
        let notifier: Arc<dyn NotifierSource> = if cfg.notify {
            Arc::new(SystemdSource::from_env())
        } else {
            Arc::new(NoNotifier)
        };
        Self {
            notifier,
            signals: signal_source(cfg),
        }
    }

    /// Builds a runner that never notifies a supervisor (console mode).
    pub fn interactive(cfg: &Config) -> Self {
        Self {
            notifier: Arc::new(NoNotifier),
            signals: signal_source(cfg),
        }
    }

    /// Replaces the notifier source.
    #[must_use]
    pub fn with_notifier(mut self, source: impl NotifierSource) -> Self {
        self.notifier = Arc::new(source);
        self
    }

    /// Replaces the signal source.
    #[must_use]
    pub fn with_signals(mut self, signals: impl SignalSource) -> Self {
        self.signals = Arc::new(signals);
        self
    }

    /// Acquires the notifier, tolerating an absent supervisor.
    async fn acquire_notifier(&self) -> Result<Option<Box<dyn Notifier>>, RunError> {
        match self.notifier.connect().await {
            Ok(Some(notifier)) => Ok(Some(notifier)),
            Ok(None) => {
                debug!("no supervisor notify socket configured");
                Ok(None)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(error = %err, "supervisor notify socket not found; continuing without notifications");
                Ok(None)
            }
            Err(err) => {
                error!(error = %err, "failed to open supervisor notify socket");
                Err(RunError::NotifierSetup(err))
            }
        }
    }

    /// `init` followed by [`serve`](Self::serve).
    async fn init_and_serve(
        &self,
        service: &dyn Service,
        shutdown: &ShutdownSignal,
        notifier: Option<&dyn Notifier>,
    ) -> Result<(), RunError> {
        let mut lifecycle = Lifecycle::new();

        info!("initializing");
        if let Err(err) = service.init().await {
            error!(phase = %lifecycle.phase(), error = %err, "service init failed");
            return Err(RunError::Init(err));
        }
        lifecycle.advance(Phase::Initialized);

        self.serve(service, shutdown, &mut lifecycle, notifier).await
    }

    /// `start` → ready → wait → stopping → `stop`. The caller has run `init`.
    pub(crate) async fn serve(
        &self,
        service: &dyn Service,
        shutdown: &ShutdownSignal,
        lifecycle: &mut Lifecycle,
        notifier: Option<&dyn Notifier>,
    ) -> Result<(), RunError> {
        info!("starting");
        if let Err(err) = service.start().await {
            error!(phase = %lifecycle.phase(), error = %err, "service start failed");
            return Err(RunError::Start(err));
        }
        lifecycle.advance(Phase::Running);
        send(notifier, Notification::Ready).await;

        wait_for_stop(shutdown, self.signals.as_ref()).await;

        lifecycle.advance(Phase::Stopping);
        send(notifier, Notification::Stopping).await;

        match service.stop().await {
            Ok(()) => {
                lifecycle.advance(Phase::Stopped);
                Ok(())
            }
            Err(err) => {
                error!(phase = %lifecycle.phase(), error = %err, "service stop failed");
                Err(RunError::Stop(err))
            }
        }
    }
}

#[async_trait]
impl Runner for ForegroundRunner {
    async fn run(&self, service: &dyn Service, shutdown: &ShutdownSignal) -> Result<(), RunError> {
        let notifier = self.acquire_notifier().await?;

        let outcome = self
            .init_and_serve(service, shutdown, notifier.as_deref())
            .await;

        let teardown = match notifier {
            Some(notifier) => notifier.close().await.map_err(|err| {
                error!(error = %err, "failed to close supervisor notify socket");
                RunError::NotifierTeardown(err)
            }),
            None => Ok(()),
        };

        RunError::aggregate(outcome, teardown)
    }
}

fn signal_source(cfg: &Config) -> Arc<dyn SignalSource> {
    if cfg.handle_signals {
        Arc::new(OsSignals)
    } else {
        Arc::new(NoSignals)
    }
}

/// Best-effort notification; failures are logged only.
async fn send(notifier: Option<&dyn Notifier>, notification: Notification) {
    let Some(notifier) = notifier else {
        return;
    };
    match notifier.notify(notification).await {
        Ok(()) => debug!(%notification, "notified supervisor"),
        Err(err) => warn!(%notification, error = %err, "failed to notify supervisor"),
    }
}
