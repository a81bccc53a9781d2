//! Agent configuration
//!
//! Defines the supervised command, the control endpoint settings and the
//! optional self-registration with a manager.

/// Self-registration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Name to register under
    pub name: String,

    /// URL the manager should use to reach this agent
    pub public_url: String,

    /// Manager base URL (e.g., "http://localhost:8098")
    pub manager_url: String,
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Shell command line of the supervised process
    pub command: String,

    /// Bearer token required on control calls
    pub token: String,

    /// Address the control endpoint listens on
    pub bind_addr: String,

    /// Number of output lines kept in memory
    pub log_buffer_lines: usize,

    /// Largest `logs` answer served
    pub log_max_bytes: usize,

    /// Start the process as soon as the agent starts
    pub autostart: bool,

    /// Register with a manager on start, when configured
    pub registration: Option<Registration>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(command: String, token: String) -> Self {
        Self {
            command,
            token,
            bind_addr: "0.0.0.0:8099".to_string(),
            log_buffer_lines: 5000,
            log_max_bytes: 256 * 1024,
            autostart: true,
            registration: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - AGENT_COMMAND (required)
    /// - AGENT_TOKEN (required)
    /// - AGENT_BIND_ADDR (optional, default: 0.0.0.0:8099)
    /// - AGENT_LOG_BUFFER_LINES (optional, default: 5000)
    /// - AGENT_LOG_MAX_BYTES (optional, default: 262144)
    /// - AGENT_AUTOSTART (optional, default: true)
    /// - AGENT_NAME, AGENT_PUBLIC_URL, MANAGER_URL (optional, all three enable self-registration)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let command = non_empty("AGENT_COMMAND")
            .ok_or_else(|| anyhow::anyhow!("AGENT_COMMAND environment variable not set"))?;

        let token = non_empty("AGENT_TOKEN")
            .ok_or_else(|| anyhow::anyhow!("AGENT_TOKEN environment variable not set"))?;

        let mut config = Self::new(command, token);

        if let Some(bind_addr) = non_empty("AGENT_BIND_ADDR") {
            config.bind_addr = bind_addr;
        }

        if let Some(lines) = non_empty("AGENT_LOG_BUFFER_LINES").and_then(|s| s.trim().parse().ok())
        {
            config.log_buffer_lines = lines;
        }

        if let Some(bytes) = non_empty("AGENT_LOG_MAX_BYTES").and_then(|s| s.trim().parse().ok()) {
            config.log_max_bytes = bytes;
        }

        if let Some(autostart) = non_empty("AGENT_AUTOSTART") {
            config.autostart = !matches!(
                autostart.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }

        config.registration = match (
            non_empty("AGENT_NAME"),
            non_empty("AGENT_PUBLIC_URL"),
            non_empty("MANAGER_URL"),
        ) {
            (Some(name), Some(public_url), Some(manager_url)) => Some(Registration {
                name,
                public_url,
                manager_url,
            }),
            _ => None,
        };

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.command.trim().is_empty() {
            anyhow::bail!("command cannot be empty");
        }

        if self.token.is_empty() {
            anyhow::bail!("token cannot be empty");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.log_buffer_lines == 0 {
            anyhow::bail!("log_buffer_lines must be greater than 0");
        }

        if self.log_max_bytes == 0 {
            anyhow::bail!("log_max_bytes must be greater than 0");
        }

        if let Some(registration) = &self.registration {
            for (key, url) in [
                ("AGENT_PUBLIC_URL", &registration.public_url),
                ("MANAGER_URL", &registration.manager_url),
            ] {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("{} must start with http:// or https://", key);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[("AGENT_COMMAND", "./worker"), ("AGENT_TOKEN", "t")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8099");
        assert_eq!(config.log_buffer_lines, 5000);
        assert_eq!(config.log_max_bytes, 256 * 1024);
        assert!(config.autostart);
        assert!(config.registration.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_required_variables() {
        assert!(config_from(&[("AGENT_TOKEN", "t")]).is_err());
        assert!(config_from(&[("AGENT_COMMAND", "./worker")]).is_err());
        assert!(config_from(&[("AGENT_COMMAND", "  "), ("AGENT_TOKEN", "t")]).is_err());
    }

    #[test]
    fn test_registration_needs_all_three() {
        let partial = config_from(&[
            ("AGENT_COMMAND", "./worker"),
            ("AGENT_TOKEN", "t"),
            ("AGENT_NAME", "build-01"),
            ("MANAGER_URL", "http://manager:8098"),
        ])
        .unwrap();
        assert!(partial.registration.is_none());

        let full = config_from(&[
            ("AGENT_COMMAND", "./worker"),
            ("AGENT_TOKEN", "t"),
            ("AGENT_NAME", "build-01"),
            ("AGENT_PUBLIC_URL", "http://10.0.0.5:8099"),
            ("MANAGER_URL", "http://manager:8098"),
            ("AGENT_AUTOSTART", "false"),
        ])
        .unwrap();
        assert!(!full.autostart);
        assert_eq!(full.log_max_bytes, 256 * 1024);
        assert_eq!(
            full.registration,
            Some(Registration {
                name: "build-01".to_string(),
                public_url: "http://10.0.0.5:8099".to_string(),
                manager_url: "http://manager:8098".to_string(),
            })
        );
    }

    #[test]
    fn test_log_max_bytes_from_env() {
        let config = config_from(&[
            ("AGENT_COMMAND", "./worker"),
            ("AGENT_TOKEN", "t"),
            ("AGENT_LOG_MAX_BYTES", " 4096 "),
        ])
        .unwrap();
        assert_eq!(config.log_max_bytes, 4096);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("./worker".to_string(), "t".to_string());
        assert!(config.validate().is_ok());

        config.log_buffer_lines = 0;
        assert!(config.validate().is_err());
        config.log_buffer_lines = 10;

        config.log_max_bytes = 0;
        assert!(config.validate().is_err());
        config.log_max_bytes = 4096;

        config.registration = Some(Registration {
            name: "build-01".to_string(),
            public_url: "10.0.0.5:8099".to_string(),
            manager_url: "http://manager:8098".to_string(),
        });
        assert!(config.validate().is_err());
    }
}
