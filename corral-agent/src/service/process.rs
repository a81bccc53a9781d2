//! Process service
//!
//! Supervises the single child process of the agent. The command line runs
//! through `sh -c`; its stdout and stderr are forwarded line by line into the
//! log buffer, prefixed with a UTC timestamp and the stream name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use corral_core::domain::runner::RunnerStatus;
use corral_core::dto::agent::AgentStatus;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::LogBufferService;

/// Longest captured line; longer output is split into several lines
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Service for controlling the supervised process
#[async_trait]
pub trait ProcessService: Send + Sync {
    /// Starts the process; a no-op when it is already running
    async fn start(&self) -> Result<()>;

    /// Kills the process, returning whether a live process was stopped
    async fn stop(&self) -> Result<bool>;

    /// Stops the process if running, then starts it again
    async fn restart(&self) -> Result<()>;

    /// Reports whether the process is alive
    async fn status(&self) -> AgentStatus;
}

struct RunningProcess {
    child: Child,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
}

/// Runs the command line through `sh -c`
pub struct ShellProcessService {
    command: String,
    logs: Arc<dyn LogBufferService>,
    current: Mutex<Option<RunningProcess>>,
}

impl ShellProcessService {
    pub fn new(command: impl Into<String>, logs: Arc<dyn LogBufferService>) -> Self {
        Self {
            command: command.into(),
            logs,
            current: Mutex::new(None),
        }
    }

    fn note(&self, message: &str) {
        self.logs.push_line(stamp("agent", message));
    }

    async fn start_locked(&self, current: &mut Option<RunningProcess>) -> Result<()> {
        if let Some(running) = current.as_mut() {
            if running.child.try_wait()?.is_none() {
                debug!("Process already running (pid {:?})", running.pid);
                return Ok(());
            }
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn `{}`", self.command))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, "stdout", Arc::clone(&self.logs));
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, "stderr", Arc::clone(&self.logs));
        }

        let pid = child.id();
        info!("Started `{}` (pid {:?})", self.command, pid);
        self.note(&format!(
            "process started (pid {})",
            pid.map_or_else(|| "?".to_string(), |p| p.to_string())
        ));

        *current = Some(RunningProcess {
            child,
            pid,
            started_at: Utc::now(),
        });
        Ok(())
    }

    async fn stop_locked(&self, current: &mut Option<RunningProcess>) -> Result<bool> {
        let Some(mut running) = current.take() else {
            return Ok(false);
        };

        if let Some(exit) = running.child.try_wait()? {
            self.note(&format!("process exited with {}", exit));
            return Ok(false);
        }

        running
            .child
            .kill()
            .await
            .with_context(|| format!("Failed to kill pid {:?}", running.pid))?;

        info!("Stopped process (pid {:?})", running.pid);
        self.note("process stopped");
        Ok(true)
    }
}

#[async_trait]
impl ProcessService for ShellProcessService {
    async fn start(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        self.start_locked(&mut current).await
    }

    async fn stop(&self) -> Result<bool> {
        let mut current = self.current.lock().await;
        self.stop_locked(&mut current).await
    }

    async fn restart(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        self.stop_locked(&mut current).await?;
        self.start_locked(&mut current).await
    }

    async fn status(&self) -> AgentStatus {
        let mut current = self.current.lock().await;

        let Some(running) = current.as_mut() else {
            return AgentStatus {
                status: RunnerStatus::Stopped,
                pid: None,
                started_at: None,
            };
        };

        match running.child.try_wait() {
            Ok(None) => AgentStatus {
                status: RunnerStatus::Running,
                pid: running.pid,
                started_at: Some(running.started_at),
            },
            Ok(Some(exit)) => {
                info!("Process (pid {:?}) exited with {}", running.pid, exit);
                self.note(&format!("process exited with {}", exit));
                *current = None;
                AgentStatus {
                    status: RunnerStatus::Stopped,
                    pid: None,
                    started_at: None,
                }
            }
            Err(e) => {
                warn!("Failed to poll process state: {}", e);
                AgentStatus {
                    status: RunnerStatus::Unknown,
                    pid: running.pid,
                    started_at: Some(running.started_at),
                }
            }
        }
    }
}

fn stamp(stream: &str, line: &str) -> String {
    format!(
        "{} [{}] {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        stream,
        line
    )
}

/// Copies lines from `reader` into the buffer until EOF
///
/// At most `MAX_LINE_BYTES` are read per line.
fn forward_lines<R>(reader: R, stream: &'static str, logs: Arc<dyn LogBufferService>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = (&mut reader)
                .take(MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut buf)
                .await;
            match read {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    logs.push_line(stamp(stream, line.trim_end_matches(['\n', '\r'])));
                }
                Err(e) => {
                    warn!("Failed to read process {}: {}", stream, e);
                    break;
                }
            }
        }
    });
}
