//! Configuration resolution for Signbatch.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.signbatch/settings.json, platform dependent)
//! 3. Project config (.signbatch/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the caller)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch::DEFAULT_TIMESTAMP_URL;
use crate::error::{Error, Result};

/// Complete Signbatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub sdk: SdkConfig,
}

/// Signing-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// RFC 3161 timestamp authority URL.
    pub timestamp_url: String,
    /// Seconds allowed per signtool invocation.
    pub per_file_timeout_secs: u64,
    /// Log level for the signing pipeline.
    pub log_level: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            timestamp_url: DEFAULT_TIMESTAMP_URL.to_string(),
            per_file_timeout_secs: 300,
            log_level: "info".to_string(),
        }
    }
}

/// Windows SDK / signtool discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SdkConfig {
    /// Explicit signtool.exe path; skips discovery when set.
    pub signtool_path: Option<PathBuf>,
    /// Extra directories to sweep for signtool candidates.
    #[serde(default)]
    pub extra_search_dirs: Vec<PathBuf>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    // Load global config
    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    // Load project config
    if let Some(dir) = project_dir {
        let project_path = dir.join(".signbatch").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    // Apply environment overrides
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".signbatch").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/signbatch/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("signbatch").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    base.signing = overlay.signing;
    if overlay.sdk.signtool_path.is_some() {
        base.sdk.signtool_path = overlay.sdk.signtool_path;
    }
    base.sdk.extra_search_dirs.extend(overlay.sdk.extra_search_dirs);
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("SIGNBATCH_TIMESTAMP_URL") {
        config.signing.timestamp_url = val;
    }
    if let Ok(val) = std::env::var("SIGNBATCH_PER_FILE_TIMEOUT") {
        if let Ok(n) = val.parse() {
            config.signing.per_file_timeout_secs = n;
        }
    }
    if let Ok(val) = std::env::var("SIGNBATCH_LOG_LEVEL") {
        config.signing.log_level = val;
    }
    if let Ok(val) = std::env::var("SIGNBATCH_SIGNTOOL") {
        config.sdk.signtool_path = Some(PathBuf::from(val));
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn built_in_defaults() {
        let config = Config::default();
        assert_eq!(config.signing.timestamp_url, DEFAULT_TIMESTAMP_URL);
        assert_eq!(config.signing.per_file_timeout_secs, 300);
        assert!(config.sdk.signtool_path.is_none());
    }

    #[test]
    fn project_config_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".signbatch");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("settings.json"),
            r#"{"signing": {"timestamp_url": "http://ts.example", "per_file_timeout_secs": 60, "log_level": "debug"}}"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.signing.timestamp_url, "http://ts.example");
        assert_eq!(config.signing.per_file_timeout_secs, 60);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".signbatch");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("settings.json"), "{not json").unwrap();

        assert!(load_config(Some(dir.path())).is_err());
    }
}
