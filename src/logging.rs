use crate::config::{LogLevel, ShellConfig, data_dir};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for the logging system
pub struct LogConfig {
    /// Directory where log files will be stored
    pub log_dir: PathBuf,
    /// Prefix for log file names
    pub file_prefix: String,
    /// Maximum number of log files to keep (rotation)
    pub max_files: usize,
    /// Level used when RUST_LOG is not set
    pub level: LogLevel,
    /// Write JSON logs to rotating files
    pub file: bool,
    /// Write human-readable logs to stderr. Off inside Explorer, which has no console.
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: data_dir().join("logs"),
            file_prefix: "parallel-shell".to_string(),
            max_files: 5,
            level: LogLevel::Info,
            file: true,
            stderr: false,
        }
    }
}

impl LogConfig {
    pub fn from_shell_config(config: &ShellConfig) -> Self {
        Self {
            log_dir: config.log_dir(),
            max_files: config.log_max_files,
            level: config.log_level,
            file: config.log_to_file,
            ..Self::default()
        }
    }
}

fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Initialize the logging system.
///
/// Log targets:
/// - `shellext::dll` - DLL entry points (class object requests, self-registration)
/// - `shellext::context_menu` - explorer command calls from the shell
/// - `registration` - registry writes and deletes, per key group
/// - `config` - configuration loading
/// - `main` - installer lifecycle
///
/// `RUST_LOG` overrides the configured level, e.g. `RUST_LOG=registration=trace`.
///
/// Installing the global subscriber fails if one is already set (for example when the host
/// process loaded another component that logs with `tracing`); that is reported as an error
/// rather than a panic.
pub fn init_logging(config: LogConfig) -> Result<LogGuard> {
    let mut worker_guard = None;

    let file_layer = if config.file {
        std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

        // Files like: parallel-shell.2026-10-18.log
        let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_dir)
            .context("Failed to create file appender")?;

        // The guard MUST be kept alive for as long as logs should reach the file
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        worker_guard = Some(guard);

        Some(
            fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_filter(build_filter(config.level)),
        )
    } else {
        None
    };

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_ansi(true)
            .with_filter(build_filter(config.level))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install global subscriber")?;

    tracing::info!(
        target: "main",
        log_dir = %config.log_dir.display(),
        max_files = config.max_files,
        level = config.level.as_str(),
        "Logging system initialized"
    );

    Ok(LogGuard {
        _worker_guard: worker_guard,
    })
}

/// Guard that ensures logs are flushed before exit.
/// Wraps the WorkerGuard from tracing_appender, which must outlive all logging.
pub struct LogGuard {
    _worker_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        tracing::debug!(target: "main", "Flushing logs before shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.file_prefix, "parallel-shell");
        assert_eq!(config.max_files, 5);
        assert!(config.file);
        assert!(!config.stderr);
        assert!(config.log_dir.ends_with("logs"));
    }

    #[test]
    fn test_config_follows_shell_config() {
        let shell = ShellConfig {
            log_to_file: false,
            log_level: LogLevel::Trace,
            log_max_files: 2,
            log_dir: Some(PathBuf::from("custom-logs")),
        };
        let config = LogConfig::from_shell_config(&shell);
        assert!(!config.file);
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.max_files, 2);
        assert_eq!(config.log_dir, PathBuf::from("custom-logs"));
    }

    #[test]
    fn test_log_directory_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let config = LogConfig {
            log_dir: log_dir.clone(),
            file_prefix: "test".to_string(),
            max_files: 3,
            ..LogConfig::default()
        };

        let result = init_logging(config);
        assert!(result.is_ok());
        assert!(log_dir.exists());

        // Keep the guard alive during test
        let _guard = result.unwrap();
    }
}
