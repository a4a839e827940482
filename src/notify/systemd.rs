//! # `NOTIFY_SOCKET` datagram notifier.
//!
//! The supervisor passes the address of a datagram socket in the
//! `NOTIFY_SOCKET` environment variable. Each notification is one datagram of
//! newline-separated `KEY=VALUE` assignments (`READY=1`, `STOPPING=1`).
//!
//! ## Addresses
//! - `/run/systemd/notify` → filesystem socket path
//! - `@name` → Linux abstract socket `\0name`
//!
//! ## Acquisition outcomes
//! ```text
//! NOTIFY_SOCKET unset / empty      ─► Ok(None)          (no supervisor)
//! socket path does not exist       ─► Err(NotFound)     (runner tolerates)
//! any other socket/connect failure ─► Err(..)           (runner aborts)
//! ```

use std::ffi::OsString;
use std::io;

use async_trait::async_trait;

use super::{Notifier, NotifierSource};

/// Environment variable carrying the supervisor socket address.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// [`NotifierSource`] for the `NOTIFY_SOCKET` protocol.
///
/// By default the address is read from the environment when a run starts;
/// [`SystemdSource::at`] pins it instead.
#[derive(Debug, Default, Clone)]
pub struct SystemdSource {
    address: Option<OsString>,
}

impl SystemdSource {
    /// Reads the address from `NOTIFY_SOCKET` at connect time.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Uses `address` instead of the environment.
    #[must_use]
    pub fn at(address: impl Into<OsString>) -> Self {
        Self {
            address: Some(address.into()),
        }
    }

    fn resolve(&self) -> Option<OsString> {
        self.address
            .clone()
            .or_else(|| std::env::var_os(NOTIFY_SOCKET_ENV))
            .filter(|addr| !addr.is_empty())
    }
}

#[async_trait]
impl NotifierSource for SystemdSource {
    async fn connect(&self) -> io::Result<Option<Box<dyn Notifier>>> {
        match self.resolve() {
            None => Ok(None),
            Some(addr) => open(addr),
        }
    }
}

#[cfg(unix)]
fn open(addr: OsString) -> io::Result<Option<Box<dyn Notifier>>> {
    let notifier = SystemdNotifier::connect(&addr)?;
    Ok(Some(Box::new(notifier)))
}

#[cfg(not(unix))]
fn open(addr: OsString) -> io::Result<Option<Box<dyn Notifier>>> {
    tracing::debug!(address = ?addr, "{NOTIFY_SOCKET_ENV} is set but unsupported on this platform");
    Ok(None)
}

#[cfg(unix)]
pub use unix::SystemdNotifier;

#[cfg(unix)]
mod unix {
    use std::ffi::OsStr;
    use std::io;
    use std::net::Shutdown;
    use std::os::unix::net::UnixDatagram as StdDatagram;

    use async_trait::async_trait;
    use tokio::net::UnixDatagram;
    use tracing::debug;

    use crate::notify::{Notification, Notifier};

    /// Connected datagram socket to the supervisor.
    #[derive(Debug)]
    pub struct SystemdNotifier {
        socket: UnixDatagram,
    }

    impl SystemdNotifier {
        /// Connects to the socket at `addr` (path, or `@name` for an abstract socket on Linux).
        ///
        /// Must be called from within a tokio runtime.
        pub fn connect(addr: &OsStr) -> io::Result<Self> {
            let socket = StdDatagram::unbound()?;
            connect_std(&socket, addr)?;
            socket.set_nonblocking(true)?;
            debug!(address = ?addr, "connected to supervisor notify socket");
            Ok(Self {
                socket: UnixDatagram::from_std(socket)?,
            })
        }
    }

    #[cfg(target_os = "linux")]
    fn connect_std(socket: &StdDatagram, addr: &OsStr) -> io::Result<()> {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::ffi::OsStrExt;
        use std::os::unix::net::SocketAddr;

        match addr.as_bytes().strip_prefix(b"@") {
            Some(name) => socket.connect_addr(&SocketAddr::from_abstract_name(name)?),
            None => socket.connect(addr),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn connect_std(socket: &StdDatagram, addr: &OsStr) -> io::Result<()> {
        socket.connect(addr)
    }

    #[async_trait]
    impl Notifier for SystemdNotifier {
        async fn notify(&self, notification: Notification) -> io::Result<()> {
            let payload = notification.as_state().as_bytes();
            let sent = self.socket.send(payload).await?;
            if sent != payload.len() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short notify write: {sent} of {} bytes", payload.len()),
                ));
            }
            Ok(())
        }

        async fn close(&self) -> io::Result<()> {
            self.socket.shutdown(Shutdown::Both)
        }
    }
}
