//! Configuration management for rPDU-Exporter
//!
//! Handles loading and validating configuration from YAML files.
//! JSON configuration files parse unchanged, YAML being a superset.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rpc::{PduAuth, TlsMode};
use crate::DEFAULT_PORT;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Monitored PDUs, keyed by name
    #[serde(default)]
    pub pdus: BTreeMap<String, PduConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// One PDU endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PduConfig {
    /// Internet address of the PDU, including the protocol
    pub url: String,

    /// Login username
    pub user: String,

    /// Login password
    pub password: String,

    /// TLS mode: `true` verifies against the platform trust store,
    /// `false` skips verification, a path pins that certificate
    #[serde(default)]
    pub ssl: TlsConfig,
}

/// Serialized TLS mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TlsConfig {
    Verify(bool),
    Pinned(PathBuf),
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig::Verify(false)
    }
}

impl From<&TlsConfig> for TlsMode {
    fn from(config: &TlsConfig) -> Self {
        match config {
            TlsConfig::Verify(true) => TlsMode::Verify,
            TlsConfig::Verify(false) => TlsMode::Insecure,
            TlsConfig::Pinned(path) => TlsMode::Pinned(path.clone()),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Resolve the configured PDUs into endpoint credentials
    pub fn pdu_auths(&self) -> Result<Vec<PduAuth>, ConfigError> {
        self.pdus
            .iter()
            .map(|(name, pdu)| {
                PduAuth::new(name, &pdu.url, &pdu.user, &pdu.password, (&pdu.ssl).into()).map_err(
                    |e| ConfigError::ValidationError(format!("PDU '{name}': {e}")),
                )
            })
            .collect()
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        for (name, pdu) in &self.pdus {
            if pdu.url.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "PDU '{name}' has an empty url"
                )));
            }
        }

        // url parsing errors surface here rather than at server start
        self.pdu_auths()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 9840);
        assert_eq!(config.server.path, "/metrics");
        assert!(config.pdus.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  port: 9840
pdus:
  pdublue.rack0:
    url: https://pdublue.rack0.example.com
    user: admin
    password: secret
    ssl: true
  pdured.rack0:
    url: https://pdured.rack0.example.com
    user: admin
    password: secret
    ssl: /etc/rpdu/pdured.pem
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pdus.len(), 2);

        let blue = &config.pdus["pdublue.rack0"];
        assert!(matches!(blue.ssl, TlsConfig::Verify(true)));

        let red = &config.pdus["pdured.rack0"];
        assert!(matches!(red.ssl, TlsConfig::Pinned(_)));
    }

    #[test]
    fn test_parse_json_flavor() {
        // deployments migrating from the older exporter keep JSON configs
        let json = r#"{
            "pdus": {
                "pdublue.rack0": {
                    "url": "https://pdublue.rack0.example.com",
                    "user": "admin",
                    "password": "secret",
                    "ssl": false
                }
            }
        }"#;
        let config: Config = serde_yaml::from_str(json).unwrap();
        assert_eq!(config.pdus.len(), 1);
        assert!(matches!(
            config.pdus["pdublue.rack0"].ssl,
            TlsConfig::Verify(false)
        ));
    }

    #[test]
    fn test_ssl_defaults_to_insecure() {
        let yaml = r#"
pdus:
  pdublue.rack0:
    url: https://pdublue.rack0.example.com
    user: admin
    password: secret
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let mode = TlsMode::from(&config.pdus["pdublue.rack0"].ssl);
        assert!(matches!(mode, TlsMode::Insecure));
    }

    #[test]
    fn test_pdu_auths() {
        let yaml = r#"
pdus:
  pdublue.rack0:
    url: pdublue.rack0.example.com
    user: admin
    password: secret
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let auths = config.pdu_auths().unwrap();
        assert_eq!(auths.len(), 1);
        assert_eq!(auths[0].name, "pdublue.rack0");
        assert_eq!(auths[0].url.scheme(), "http");
    }
}
