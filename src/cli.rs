//! CLI argument parsing for rPDU-Exporter
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: RPDU_CONFIG)
//! - `--port` / `-p`: Server port (overrides config file, env: RPDU_PORT)
//! - `--bind-address`: Server bind address (env: RPDU_BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: RPDU_METRICS_PATH)
//! - `--validate`: Validate configuration without starting the server
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: RPDU_LOG_LEVEL)
//!
//! # Precedence
//!
//! CLI arguments take precedence over environment variables, which take
//! precedence over config file values.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// rPDU-Exporter - High-performance Raritan PDU metrics exporter written in Rust
///
/// Polls Raritan power distribution units over the vendor JSON-RPC bulk
/// interface and exports their sensor readings in Prometheus format.
#[derive(Parser, Debug)]
#[command(name = "rpdu-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "RPDU_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "RPDU_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "RPDU_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    /// Must start with '/'
    #[arg(long, value_name = "PATH", env = "RPDU_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Validate configuration without starting the server
    #[arg(long)]
    pub validate: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "RPDU_LOG_LEVEL"
    )]
    pub log_level: LogLevel,
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["rpdu-exporter"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert_eq!(cli.port, None);
        assert_eq!(cli.bind_address, None);
        assert_eq!(cli.metrics_path, None);
        assert!(!cli.validate);
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_cli_with_options() {
        let cli = Cli::parse_from([
            "rpdu-exporter",
            "-c",
            "custom.yaml",
            "-p",
            "8080",
            "--log-level",
            "debug",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.yaml"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(cli.validate);
    }

    #[test]
    fn test_cli_server_overrides() {
        let cli = Cli::parse_from([
            "rpdu-exporter",
            "--bind-address",
            "127.0.0.1",
            "--metrics-path",
            "/custom-metrics",
        ]);
        assert_eq!(cli.bind_address, Some("127.0.0.1".to_string()));
        assert_eq!(cli.metrics_path, Some("/custom-metrics".to_string()));
    }
}
