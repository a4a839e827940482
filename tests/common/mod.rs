//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use svcrunner::notify::{Notification, Notifier, NotifierSource};
use svcrunner::signals::SignalSource;
use svcrunner::{BoxError, Service};
use tokio::sync::Notify;

/// Ordered record of everything the doubles observed.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Service that records its calls and fails on demand.
pub struct RecordingService {
    pub journal: Journal,
    fail_init: Option<&'static str>,
    fail_start: Option<&'static str>,
    fail_stop: Option<&'static str>,
    stop_on_start: bool,
}

impl RecordingService {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail_init: None,
            fail_start: None,
            fail_stop: None,
            stop_on_start: false,
        }
    }

    pub fn failing_init(mut self, msg: &'static str) -> Self {
        self.fail_init = Some(msg);
        self
    }

    pub fn failing_start(mut self, msg: &'static str) -> Self {
        self.fail_start = Some(msg);
        self
    }

    pub fn failing_stop(mut self, msg: &'static str) -> Self {
        self.fail_stop = Some(msg);
        self
    }

    /// Calls `svcrunner::stop()` from inside `start`.
    pub fn stopping_itself(mut self) -> Self {
        self.stop_on_start = true;
        self
    }
}

#[async_trait]
impl Service for RecordingService {
    fn name(&self) -> &str {
        "recording"
    }

    async fn init(&self) -> Result<(), BoxError> {
        self.journal.push("init");
        match self.fail_init {
            Some(msg) => Err(msg.into()),
            None => Ok(()),
        }
    }

    async fn start(&self) -> Result<(), BoxError> {
        self.journal.push("start");
        if self.stop_on_start {
            svcrunner::stop();
            svcrunner::stop();
        }
        match self.fail_start {
            Some(msg) => Err(msg.into()),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), BoxError> {
        self.journal.push("stop");
        match self.fail_stop {
            Some(msg) => Err(msg.into()),
            None => Ok(()),
        }
    }
}

/// How [`RecordingSource::connect`] behaves.
#[derive(Clone, Copy)]
pub enum Setup {
    Present,
    Absent,
    Missing,
    Broken,
}

/// Notifier source writing into a [`Journal`].
pub struct RecordingSource {
    journal: Journal,
    setup: Setup,
    fail_notify: bool,
    fail_close: bool,
}

impl RecordingSource {
    pub fn new(journal: &Journal, setup: Setup) -> Self {
        Self {
            journal: journal.clone(),
            setup,
            fail_notify: false,
            fail_close: false,
        }
    }

    pub fn failing_notify(mut self) -> Self {
        self.fail_notify = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl NotifierSource for RecordingSource {
    async fn connect(&self) -> io::Result<Option<Box<dyn Notifier>>> {
        match self.setup {
            Setup::Present => Ok(Some(Box::new(RecordingNotifier {
                journal: self.journal.clone(),
                fail_notify: self.fail_notify,
                fail_close: self.fail_close,
            }))),
            Setup::Absent => Ok(None),
            Setup::Missing => Err(io::Error::new(io::ErrorKind::NotFound, "no such socket")),
            Setup::Broken => Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        }
    }
}

struct RecordingNotifier {
    journal: Journal,
    fail_notify: bool,
    fail_close: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> io::Result<()> {
        if self.fail_notify {
            return Err(io::Error::other("notify write failed"));
        }
        self.journal.push(format!("notify:{notification}"));
        Ok(())
    }

    async fn close(&self) -> io::Result<()> {
        self.journal.push("close");
        if self.fail_close {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}

/// Signal source fired by the test.
#[derive(Clone, Default)]
pub struct ManualSignal(Arc<Notify>);

impl ManualSignal {
    /// Delivers one simulated interrupt (remembered if nobody waits yet).
    pub fn fire(&self) {
        self.0.notify_one();
    }
}

#[async_trait]
impl SignalSource for ManualSignal {
    async fn recv(&self) -> io::Result<()> {
        self.0.notified().await;
        Ok(())
    }
}
