//! Logging configuration for drop
//!
//! Diagnostics go through the `tracing` framework. The CLI keeps stderr
//! quiet by default (`warn`) and raises the level with `-v`; `RUST_LOG`
//! overrides both. A log file, when requested, rotates daily and is
//! written from a background worker.

use drop_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "drop.log";

/// Log output destination
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Output to stderr
    Stderr,
    /// Output to a file with rotation
    File(PathBuf),
    /// Output to both stderr and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Multi-line human-readable format
    Pretty,
    /// Compact single-line format (default)
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level filter
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            output: LogOutput::Stderr,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Config for a `-v` count: 0 = warn, 1 = info, 2+ = debug
    pub fn for_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        Self::default().with_level(level)
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stderr and file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Initialize global logging with this configuration
    ///
    /// Returns a guard that must be kept alive while logging to a file.
    /// When the guard is dropped, the logging worker thread is shut down.
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::InvalidInput(format!("invalid log level: {}", e)))?;

        let already_set = |e: tracing_subscriber::util::TryInitError| {
            Error::InvalidOperation(format!("logging already initialized: {}", e))
        };

        match self.output {
            LogOutput::Stderr => {
                match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr).pretty())
                        .try_init()
                        .map_err(already_set)?,
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr).compact())
                        .try_init()
                        .map_err(already_set)?,
                }
                Ok(None)
            }
            LogOutput::File(path) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(rolling_appender(&path));

                match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false).pretty())
                        .try_init()
                        .map_err(already_set)?,
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false).compact())
                        .try_init()
                        .map_err(already_set)?,
                }
                Ok(Some(guard))
            }
            LogOutput::Both(path) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(rolling_appender(&path));

                // One format for both layers keeps the layer types unboxed
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr).compact())
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false).compact())
                    .try_init()
                    .map_err(already_set)?;

                Ok(Some(guard))
            }
        }
    }
}

fn rolling_appender(path: &Path) -> tracing_appender::rolling::RollingFileAppender {
    tracing_appender::rolling::daily(
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(".")),
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert!(matches!(config.output, LogOutput::Stderr));
        assert!(matches!(config.format, LogFormat::Compact));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LogConfig::for_verbosity(0).level, "warn");
        assert_eq!(LogConfig::for_verbosity(1).level, "info");
        assert_eq!(LogConfig::for_verbosity(2).level, "debug");
        assert_eq!(LogConfig::for_verbosity(9).level, "debug");
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::for_verbosity(2)
            .with_file("/tmp/drop-test.log")
            .with_format(LogFormat::Pretty);
        assert_eq!(config.level, "debug");
        assert!(matches!(config.output, LogOutput::File(_)));
        assert!(matches!(config.format, LogFormat::Pretty));

        let config = config.with_both("drop.log");
        assert!(matches!(config.output, LogOutput::Both(ref p) if p == Path::new("drop.log")));
    }
}
