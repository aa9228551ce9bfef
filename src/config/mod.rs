//! Configuration module
//!
//! Handles loading and managing configuration.

mod env;
mod file;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard};
pub use file::{load_requests, ConfigFile};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Harness configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Seconds to wait for a program to signal readiness; unset waits forever
    pub ready_timeout_secs: Option<u64>,

    /// Number of workers for batch runs
    pub workers: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Output format (table, json, json-pretty, summary)
    pub format: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ready_timeout_secs: None,
            workers: 1,
            log_level: "info".to_string(),
            format: "table".to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_secs.map(Duration::from_secs)
    }

    /// Overlay values set in the environment
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(secs) = env.ready_timeout {
            self.ready_timeout_secs = Some(secs);
        }
        if let Some(workers) = env.workers {
            self.workers = workers;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.ready_timeout_secs == Some(0) {
            anyhow::bail!("ready_timeout_secs must be positive when set");
        }
        if crate::utils::LogLevel::from_str(&self.log_level).is_none() {
            anyhow::bail!("Unknown log level: {}", self.log_level);
        }
        if crate::output::OutputFormat::from_str(&self.format).is_none() {
            anyhow::bail!("Unknown output format: {}", self.format);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.workers, 1);
        assert_eq!(config.ready_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env() {
        let mut config = HarnessConfig::default();
        let env = EnvConfig {
            ready_timeout: Some(15),
            workers: Some(4),
            ..Default::default()
        };
        config.apply_env(&env);

        assert_eq!(config.ready_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.workers, 4);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_workers = HarnessConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(zero_workers.validate().is_err());

        let zero_timeout = HarnessConfig {
            ready_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let bad_format = HarnessConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(bad_format.validate().is_err());
    }
}
