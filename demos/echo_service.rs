//! # Example: echo_service
//!
//! A TCP echo server run as a supervised service.
//!
//! Demonstrates how to:
//! - Implement [`Service`] with work split between `init`, `start` and `stop`.
//! - Run it with [`svcrunner::run`] and exit non-zero on failure.
//! - Stop it with Ctrl-C, `kill -TERM`, `systemctl stop`, or the Windows service manager.
//!
//! ## Flow
//! ```text
//! main()
//!   └─► svcrunner::run(&EchoService)
//!         ├─► init()   bind 127.0.0.1:7007
//!         ├─► start()  spawn accept loop
//!         ├─► READY=1  (when NOTIFY_SOCKET is set)
//!         ├─► wait for SIGINT / SIGTERM / service-manager Stop
//!         └─► stop()   cancel accept loop, await it
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example echo_service
//! # in another shell
//! nc 127.0.0.1 7007
//! ```

use std::sync::Mutex;

use async_trait::async_trait;
use svcrunner::{BoxError, Service};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ADDR: &str = "127.0.0.1:7007";

#[derive(Default)]
struct EchoService {
    listener: Mutex<Option<TcpListener>>,
    accept: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

#[async_trait]
impl Service for EchoService {
    fn name(&self) -> &str {
        "echo"
    }

    async fn init(&self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(ADDR).await?;
        info!(addr = ADDR, "listening");
        *self.listener.lock().map_err(|_| "listener lock poisoned")? = Some(listener);
        Ok(())
    }

    async fn start(&self) -> Result<(), BoxError> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| "listener lock poisoned")?
            .take()
            .ok_or("start called before init")?;
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            info!(%peer, "connection");
                            tokio::spawn(echo(stream, cancel.child_token()));
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    },
                }
            }
        });
        *self.accept.lock().map_err(|_| "accept lock poisoned")? = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BoxError> {
        self.cancel.cancel();
        let handle = self.accept.lock().map_err(|_| "accept lock poisoned")?.take();
        if let Some(handle) = handle {
            handle.await?;
        }
        info!("accept loop finished");
        Ok(())
    }
}

async fn echo(mut stream: tokio::net::TcpStream, cancel: CancellationToken) {
    let mut buf = [0u8; 1024];
    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => return,
            read = stream.read(&mut buf) => match read {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            },
        };
        if stream.write_all(&buf[..n]).await.is_err() {
            return;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = svcrunner::run(&EchoService::default()).await {
        eprintln!("echo: {err}");
        std::process::exit(1);
    }
}
