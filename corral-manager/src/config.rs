//! Manager configuration
//!
//! Defines all configurable parameters for the manager: bind address,
//! persistence, supervision deadlines and log windows.

use std::path::PathBuf;
use std::time::Duration;

/// Manager configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// Postgres URL; runners are kept in memory when unset
    pub database_url: Option<String>,

    /// Deadline for a single status probe
    pub probe_timeout: Duration,

    /// Deadline for restart and stop commands
    pub restart_timeout: Duration,

    /// Interval of the background status refresh, `None` when disabled
    pub refresh_interval: Option<Duration>,

    /// Directory holding `<name>.log` files; logs are proxied from runners when unset
    pub log_dir: Option<PathBuf>,

    /// Maximum number of log lines returned per request
    pub log_tail_lines: usize,

    /// Maximum number of log bytes returned per request
    pub log_max_bytes: usize,

    /// Deadline for fetching logs
    pub log_fetch_timeout: Duration,

    /// Directory of the admin panel's static files
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8098".to_string(),
            database_url: None,
            probe_timeout: Duration::from_secs(3),
            restart_timeout: Duration::from_secs(5),
            refresh_interval: Some(Duration::from_secs(15)),
            log_dir: None,
            log_tail_lines: 1000,
            log_max_bytes: 256 * 1024,
            log_fetch_timeout: Duration::from_secs(5),
            static_dir: None,
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - MANAGER_BIND_ADDR (default: 0.0.0.0:8098)
    /// - DATABASE_URL
    /// - PROBE_TIMEOUT (seconds, default: 3)
    /// - RESTART_TIMEOUT (seconds, default: 5)
    /// - STATUS_REFRESH_INTERVAL (seconds, default: 15, 0 disables)
    /// - LOG_DIR
    /// - LOG_TAIL_LINES (default: 1000)
    /// - LOG_MAX_BYTES (default: 262144)
    /// - LOG_FETCH_TIMEOUT (seconds, default: 5)
    /// - STATIC_DIR
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    ///
    /// Unparsable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| non_empty(key).and_then(|s| s.trim().parse::<u64>().ok());

        let refresh_interval = match number("STATUS_REFRESH_INTERVAL") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.refresh_interval,
        };

        Self {
            bind_addr: non_empty("MANAGER_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: non_empty("DATABASE_URL"),
            probe_timeout: number("PROBE_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            restart_timeout: number("RESTART_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.restart_timeout),
            refresh_interval,
            log_dir: non_empty("LOG_DIR").map(PathBuf::from),
            log_tail_lines: number("LOG_TAIL_LINES")
                .map(|n| n as usize)
                .unwrap_or(defaults.log_tail_lines),
            log_max_bytes: number("LOG_MAX_BYTES")
                .map(|n| n as usize)
                .unwrap_or(defaults.log_max_bytes),
            log_fetch_timeout: number("LOG_FETCH_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.log_fetch_timeout),
            static_dir: non_empty("STATIC_DIR").map(PathBuf::from),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
            }
        }

        if self.probe_timeout.is_zero() {
            anyhow::bail!("probe_timeout must be greater than 0");
        }

        if self.restart_timeout.is_zero() {
            anyhow::bail!("restart_timeout must be greater than 0");
        }

        if self.log_fetch_timeout.is_zero() {
            anyhow::bail!("log_fetch_timeout must be greater than 0");
        }

        if self.log_tail_lines == 0 {
            anyhow::bail!("log_tail_lines must be greater than 0");
        }

        if self.log_max_bytes == 0 {
            anyhow::bail!("log_max_bytes must be greater than 0");
        }

        Ok(())
    }
}
