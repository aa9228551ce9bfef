//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "WORKER_HARNESS";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Readiness timeout from WORKER_HARNESS_READY_TIMEOUT
    pub ready_timeout: Option<u64>,
    /// Worker count from WORKER_HARNESS_WORKERS
    pub workers: Option<usize>,
    /// Log level from WORKER_HARNESS_LOG
    pub log_level: Option<String>,
    /// Output format from WORKER_HARNESS_FORMAT
    pub format: Option<String>,
    /// Config file from WORKER_HARNESS_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            ready_timeout: get_env_parse("READY_TIMEOUT"),
            workers: get_env_parse("WORKERS"),
            log_level: get_env("LOG"),
            format: get_env("FORMAT"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.ready_timeout.is_some()
            || self.workers.is_some()
            || self.log_level.is_some()
            || self.format.is_some()
            || self.config_file.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_READY_TIMEOUT: {:?}", ENV_PREFIX, self.ready_timeout);
        println!("  {}_WORKERS:       {:?}", ENV_PREFIX, self.workers);
        println!("  {}_LOG:           {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_FORMAT:        {:?}", ENV_PREFIX, self.format);
        println!("  {}_CONFIG:        {:?}", ENV_PREFIX, self.config_file);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn ready_timeout(mut self, secs: u64) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_READY_TIMEOUT"), secs.to_string()));
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_WORKERS"), workers.to_string()));
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_LOG"), level.into()));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all WORKER_HARNESS environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_READY_TIMEOUT  Seconds to wait for readiness (unset: no limit)");
    println!("  {ENV_PREFIX}_WORKERS        Worker count for batch runs");
    println!("  {ENV_PREFIX}_LOG            Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_FORMAT         Output format (table, json, json-pretty, summary)");
    println!("  {ENV_PREFIX}_CONFIG         Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_READY_TIMEOUT=30");
    println!("  worker-harness run --exe Good --script good.mod");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.ready_timeout.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .ready_timeout(45)
            .workers(6)
            .log_level("debug")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.ready_timeout, Some(45));
        assert_eq!(config.workers, Some(6));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.has_any());
    }
}
