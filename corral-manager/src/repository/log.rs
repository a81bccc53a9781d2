//! Log Repository
//!
//! Append-only log sources the manager can read a runner's recent output from:
//! - `FileLogSource` tails `<dir>/<name>.log` on the manager host
//! - `HttpLogSource` proxies the runner agent's `/logs` endpoint

use anyhow::{Context, Result};
use async_trait::async_trait;
use corral_core::domain::runner::RunnerRecord;
use corral_core::dto::agent::AgentLogs;
use reqwest::Client;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::control::{endpoint, read_capped};

/// Source of a runner's most recent log output
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Reads at most the last `lines` lines and `max_bytes` bytes of output
    ///
    /// Returns `None` when the runner has not produced any log yet.
    async fn tail(
        &self,
        runner: &RunnerRecord,
        lines: usize,
        max_bytes: usize,
    ) -> Result<Option<String>>;
}

/// Log files written next to the manager, one per runner
pub struct FileLogSource {
    dir: PathBuf,
}

impl FileLogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.log", name))
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn tail(
        &self,
        runner: &RunnerRecord,
        lines: usize,
        max_bytes: usize,
    ) -> Result<Option<String>> {
        let path = self.path_for(&runner.name);

        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()));
            }
        };

        let len = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        let start = len.saturating_sub(max_bytes as u64);

        // One byte before the cut tells whether it falls on a line start
        file.seek(SeekFrom::Start(start.saturating_sub(1)))
            .await
            .context("Failed to seek log file")?;

        let mut buf = Vec::with_capacity((len - start) as usize + 1);
        file.read_to_end(&mut buf)
            .await
            .context("Failed to read log file")?;

        let window = if start > 0 {
            cut_window(&buf)
        } else {
            &buf[..]
        };
        let text = String::from_utf8_lossy(window);

        Ok(Some(last_lines(&text, lines).to_string()))
    }
}

/// Proxies the runner agent's log buffer
pub struct HttpLogSource {
    client: Client,
}

impl HttpLogSource {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn tail(
        &self,
        runner: &RunnerRecord,
        lines: usize,
        max_bytes: usize,
    ) -> Result<Option<String>> {
        let url = endpoint(&runner.url, "logs");

        let response = self
            .client
            .get(&url)
            .query(&[("lines", lines), ("max_bytes", max_bytes)])
            .bearer_auth(&runner.token)
            .send()
            .await
            .context("Failed to reach runner")?;

        if !response.status().is_success() {
            anyhow::bail!("Runner answered with status {}", response.status());
        }

        // Room for JSON escaping of every byte
        let budget = max_bytes.saturating_mul(6).saturating_add(4096);
        let (raw, truncated) = read_capped(response, budget)
            .await
            .context("Failed to read runner logs")?;
        if truncated {
            anyhow::bail!("Runner sent more than {} bytes of logs", budget);
        }

        let body: AgentLogs =
            serde_json::from_slice(&raw).context("Failed to parse runner logs")?;

        if body.logs.is_empty() {
            return Ok(None);
        }

        Ok(Some(body.logs))
    }
}

/// Trims a window read from `cut - 1` down to whole lines
///
/// `buf[0]` is the byte just before the cut. When the cut lands inside a
/// line that partial line is dropped, unless it is all the window holds; then
/// the window starts at the first character boundary instead.
fn cut_window(buf: &[u8]) -> &[u8] {
    let Some((&before, rest)) = buf.split_first() else {
        return buf;
    };

    if before == b'\n' {
        return rest;
    }

    match rest.iter().position(|&b| b == b'\n') {
        Some(pos) if pos + 1 < rest.len() => &rest[pos + 1..],
        _ => from_char_boundary(rest),
    }
}

/// Skips UTF-8 continuation bytes left at the front of a byte window
fn from_char_boundary(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take(3)
        .take_while(|&&b| b & 0xC0 == 0x80)
        .count();
    &bytes[skip..]
}

/// Returns the suffix of `text` holding its last `n` lines
pub(crate) fn last_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }

    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    match trimmed.rmatch_indices('\n').nth(n - 1) {
        Some((pos, _)) => &text[pos + 1..],
        None => text,
    }
}
