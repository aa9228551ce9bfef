//! Configuration file management
//!
//! Handles finding, loading, and saving configuration and request files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::HarnessConfig;
use crate::protocol::LaunchRequest;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./worker-harness.yaml",
    "./worker-harness.yml",
    "./.worker-harness.yaml",
    "~/.config/worker-harness/config.yaml",
];

/// Full configuration file structure
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub harness: HarnessConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ConfigFile {
    pub fn new(harness: HarnessConfig) -> Self {
        Self {
            version: default_version(),
            harness,
        }
    }

    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::new(HarnessConfig::default())),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != "1.0" {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }
        self.harness.validate()
    }
}

/// Batch file: either a bare list of requests or `{ requests: [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestFile {
    List(Vec<LaunchRequest>),
    Wrapped { requests: Vec<LaunchRequest> },
}

/// Load launch requests from a YAML or JSON batch file
pub fn load_requests(path: impl AsRef<Path>) -> Result<Vec<LaunchRequest>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;

    let file: RequestFile = if is_yaml_file(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML requests: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON requests: {}", path.display()))?
    };

    Ok(match file {
        RequestFile::List(requests) | RequestFile::Wrapped { requests } => requests,
    })
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_save_load() {
        let dir = tempdir().unwrap();
        let config = ConfigFile::new(HarnessConfig {
            ready_timeout_secs: Some(30),
            workers: 3,
            ..Default::default()
        });

        for name in ["config.yaml", "nested/config.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(ConfigFile::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "harness:\n  workers: 2\n").unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.harness.workers, 2);
        assert_eq!(config.harness.ready_timeout_secs, None);
    }

    #[test]
    fn test_unsupported_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"version": "9.9"}"#).unwrap();

        assert!(ConfigFile::load(&path).is_err());
    }

    #[test]
    fn test_load_requests_both_shapes() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("batch.yaml");
        std::fs::write(
            &yaml,
            "requests:\n  - exe: Good\n    scripts: [good.mod]\n  - exe: Missing\n",
        )
        .unwrap();
        let requests = load_requests(&yaml).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].scripts, vec!["good.mod"]);

        let json = dir.path().join("batch.json");
        std::fs::write(&json, r#"[{"exe": "Bad", "scripts": ["bad.mod"], "args": ["x"]}]"#)
            .unwrap();
        let requests = load_requests(&json).unwrap();
        assert_eq!(requests[0], LaunchRequest::new("Bad").with_script("bad.mod").with_arg("x"));
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
