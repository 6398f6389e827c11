use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Settings read by the shell extension, stored as JSON at `~/.parallel/shell.json`.
///
/// The extension never writes this file; it is edited by hand or by the main application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Whether to write logs to file
    pub log_to_file: bool,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: LogLevel,
    /// Maximum number of log files to keep
    pub log_max_files: usize,
    /// Log directory. None means `~/.parallel/logs`.
    pub log_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            log_to_file: true,
            log_level: LogLevel::Info,
            log_max_files: 5,
            log_dir: None,
        }
    }
}

/// `~/.parallel`, falling back to the working directory when no home is known.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parallel")
}

impl ShellConfig {
    pub fn default_path() -> PathBuf {
        data_dir().join("shell.json")
    }

    /// Load configuration from the specified path, using defaults for missing fields
    pub fn load_from_path(path: &Path) -> Result<ShellConfig> {
        if !path.exists() {
            tracing::debug!(target: "config", path = %path.display(), "Config file not found, using defaults");
            return Ok(ShellConfig::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: ShellConfig =
            serde_json::from_str(&content).context("Failed to parse config file")?;

        tracing::debug!(target: "config", path = %path.display(), "Loaded configuration from file");
        Ok(config)
    }

    /// Load from the default location. A broken file degrades to defaults.
    pub fn load_or_default() -> ShellConfig {
        let path = Self::default_path();
        Self::load_from_path(&path).unwrap_or_else(|e| {
            tracing::warn!(target: "config", path = %path.display(), error = %e, "Ignoring unreadable config");
            ShellConfig::default()
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShellConfig::load_from_path(&dir.path().join("shell.json")).unwrap();
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.json");
        fs::write(&path, r#"{ "log_level": "trace", "log_dir": "D:\\logs" }"#).unwrap();

        let config = ShellConfig::load_from_path(&path).unwrap();
        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.log_dir(), PathBuf::from(r"D:\logs"));
        assert!(config.log_to_file);
        assert_eq!(config.log_max_files, 5);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(ShellConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        let level: LogLevel = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(level, LogLevel::Error);
    }
}
