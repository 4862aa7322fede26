//! Backend endpoint resolution.
//!
//! An externally configured URL is used as-is. Otherwise a disposable backend
//! is started on a free local port the first time an endpoint is needed, and
//! torn down by [`BackendLifecycle::shutdown`].

use std::io;
use std::net::{Ipv4Addr, TcpListener};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use ask_protocol::CancelSignal;
use session_api::cancel::is_cancelled;

const READINESS_POLL: Duration = Duration::from_millis(50);
const LOCALHOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    External(String),
    Disposable(String),
}

impl Endpoint {
    pub fn url(&self) -> &str {
        match self {
            Self::External(url) | Self::Disposable(url) => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no free local port for the backend: {0}")]
    Port(#[source] io::Error),
    #[error("failed to start backend `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("backend exited before it was ready ({status})")]
    EarlyExit { status: String },
    #[error("backend did not accept connections within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("interrupted while starting the backend")]
    Cancelled,
}

/// A started backend that must be stopped exactly once.
#[async_trait]
pub trait RunningBackend: Send {
    fn url(&self) -> &str;

    async fn stop(&mut self) -> io::Result<()>;
}

#[async_trait]
pub trait BackendLauncher: Send + Sync {
    async fn launch(
        &self,
        cancel: Option<&CancelSignal>,
    ) -> Result<Box<dyn RunningBackend>, LifecycleError>;
}

/// Starts `<program> serve --port <port>` and waits until the port accepts
/// connections.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: String,
    start_timeout: Duration,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<String>, start_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            start_timeout,
        }
    }
}

fn free_port() -> io::Result<u16> {
    let listener = TcpListener::bind((LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

struct ProcessBackend {
    child: Child,
    url: String,
}

#[async_trait]
impl RunningBackend for ProcessBackend {
    fn url(&self) -> &str {
        &self.url
    }

    async fn stop(&mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill().await?;
        }
        Ok(())
    }
}

async fn kill_quietly(child: &mut Child) {
    if let Err(err) = child.kill().await {
        debug!(error = %err, "backend kill after failed start");
    }
}

#[async_trait]
impl BackendLauncher for ProcessLauncher {
    async fn launch(
        &self,
        cancel: Option<&CancelSignal>,
    ) -> Result<Box<dyn RunningBackend>, LifecycleError> {
        let port = free_port().map_err(LifecycleError::Port)?;
        let mut child = Command::new(&self.program)
            .arg("serve")
            .arg("--port")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LifecycleError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        info!(program = %self.program, port, pid = ?child.id(), "starting disposable backend");

        let deadline = Instant::now() + self.start_timeout;
        loop {
            if is_cancelled(cancel) {
                kill_quietly(&mut child).await;
                return Err(LifecycleError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Err(LifecycleError::EarlyExit {
                        status: status.to_string(),
                    })
                }
                Ok(None) => {}
                Err(err) => debug!(error = %err, "backend status check failed"),
            }
            if TcpStream::connect((LOCALHOST, port)).await.is_ok() {
                break;
            }
            if Instant::now() >= deadline {
                kill_quietly(&mut child).await;
                return Err(LifecycleError::Timeout {
                    timeout_ms: u64::try_from(self.start_timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            sleep(READINESS_POLL).await;
        }

        let url = format!("http://{LOCALHOST}:{port}");
        info!(%url, "disposable backend ready");
        Ok(Box::new(ProcessBackend { child, url }))
    }
}

/// Resolves the backend endpoint at most once per process.
pub struct BackendLifecycle {
    external: Option<String>,
    launcher: Box<dyn BackendLauncher>,
    running: Mutex<Option<Box<dyn RunningBackend>>>,
    launches: AtomicUsize,
}

impl BackendLifecycle {
    /// `external` wins when present and non-blank; `launcher` is then never used.
    pub fn new(external: Option<String>, launcher: Box<dyn BackendLauncher>) -> Self {
        Self {
            external: external.filter(|url| !url.trim().is_empty()),
            launcher,
            running: Mutex::new(None),
            launches: AtomicUsize::new(0),
        }
    }

    /// Number of disposable backends started so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Acquire)
    }

    pub async fn endpoint(&self, cancel: Option<&CancelSignal>) -> Result<Endpoint, LifecycleError> {
        if let Some(url) = &self.external {
            return Ok(Endpoint::External(url.clone()));
        }
        let mut running = self.running.lock().await;
        if let Some(backend) = running.as_ref() {
            return Ok(Endpoint::Disposable(backend.url().to_string()));
        }
        let backend = self.launcher.launch(cancel).await?;
        self.launches.fetch_add(1, Ordering::AcqRel);
        let url = backend.url().to_string();
        *running = Some(backend);
        Ok(Endpoint::Disposable(url))
    }

    /// Stops a disposable backend if one was started. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let Some(mut backend) = self.running.lock().await.take() else {
            return;
        };
        match backend.stop().await {
            Ok(()) => info!(url = backend.url(), "disposable backend stopped"),
            Err(err) => warn!(url = backend.url(), error = %err, "failed to stop disposable backend"),
        }
    }
}
