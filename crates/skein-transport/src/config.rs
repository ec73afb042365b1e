//! Transport configuration.
//!
//! Loaded from YAML, JSON or TOML. Every field has a default, so an empty
//! file is a valid configuration.

use crate::logging::LogConfig;
use crate::pipeline::DEFAULT_MAX_PIPELINED_QUERIES;
use serde::{Deserialize, Serialize};
use skein_proto::{DEFAULT_EDNS_UDP_SIZE, DNS_PORT, MAX_UDP_MESSAGE_SIZE};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("File not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Server port.
    pub port: u16,

    /// Read/write timeout applied to every operation on a connection.
    pub query_timeout_ms: u64,

    /// Connection establishment timeout.
    pub connect_timeout_ms: u64,

    /// Idle time after which a pipelined connection is closed. 0 keeps
    /// connections open until they fail.
    pub idle_timeout_secs: u64,

    /// Allow UDP.
    pub udp_enabled: bool,

    /// Allow TCP.
    pub tcp_enabled: bool,

    /// Receive buffer for UDP responses.
    pub udp_payload_size: u16,

    /// Local address to bind outgoing sockets to.
    pub local_address: Option<IpAddr>,

    /// Maximum exchanges in flight on one TCP connection.
    pub max_pipelined_queries: usize,

    /// Logging.
    pub logging: LogConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: DNS_PORT,
            query_timeout_ms: 5000,
            connect_timeout_ms: 2000,
            idle_timeout_secs: 30,
            udp_enabled: true,
            tcp_enabled: true,
            udp_payload_size: DEFAULT_EDNS_UDP_SIZE,
            local_address: None,
            max_pipelined_queries: DEFAULT_MAX_PIPELINED_QUERIES,
            logging: LogConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Loads configuration from a file.
    ///
    /// The format follows the extension; anything else is read as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        Ok(config)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.udp_enabled && !self.tcp_enabled {
            return Err(ConfigError::Validation(
                "at least one of UDP and TCP must be enabled".to_string(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if (self.udp_payload_size as usize) < MAX_UDP_MESSAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "udp_payload_size".to_string(),
                message: format!("must be at least {MAX_UDP_MESSAGE_SIZE}"),
            });
        }
        if self.max_pipelined_queries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pipelined_queries".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Per-operation read/write timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Connection establishment timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Idle timeout for pipelined connections, `None` if disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
