//! zkelect Configuration
//!
//! This module provides configuration structures for the zkelect
//! leader-election component.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the configurable session timeout (5 minutes)
pub const MAX_SESSION_TIMEOUT_MS: u64 = 5 * 60 * 1000;

/// Main zkelect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZkElectConfig {
    /// Election and coordination-service settings
    #[serde(default)]
    pub election: ElectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Election configuration
///
/// Immutable per connection: the engine snapshots these values once per
/// (re)connect. Runtime changes take effect on the next session, not on a
/// session that is already established.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Coordination-service host
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Coordination-service port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Name of the election node, directly under the root
    #[serde(default = "default_election_path")]
    pub election_path: String,

    /// Resolve coordination hosts in a deterministic order
    ///
    /// Forwarded to the session connector only. Affects which host a
    /// multi-host connect tries first, never election fairness.
    #[serde(default)]
    pub host_order_deterministic: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_endpoint() -> String {
    "zoo1".to_string()
}

fn default_port() -> u16 {
    2181
}

fn default_session_timeout_ms() -> u64 {
    5000
}

fn default_election_path() -> String {
    "master".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            port: default_port(),
            session_timeout_ms: default_session_timeout_ms(),
            election_path: default_election_path(),
            host_order_deterministic: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ElectionConfig {
    /// Validate the election settings
    pub fn validate(&self) -> crate::Result<()> {
        if self.endpoint.is_empty() {
            return Err(crate::Error::Config("election.endpoint cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(crate::Error::Config("election.port must be in 1-65535".into()));
        }

        if self.session_timeout_ms > MAX_SESSION_TIMEOUT_MS {
            return Err(crate::Error::Config(format!(
                "election.session_timeout_ms must be at most {}",
                MAX_SESSION_TIMEOUT_MS
            )));
        }

        if self.election_path.is_empty() {
            return Err(crate::Error::Config("election.election_path cannot be empty".into()));
        }

        if self.election_path.contains('/') {
            return Err(crate::Error::Config(
                "election.election_path must be a single node name, without '/'".into(),
            ));
        }

        Ok(())
    }

    /// Get the connect string (host:port)
    pub fn connect_string(&self) -> String {
        format!("{}:{}", self.endpoint, self.port)
    }

    /// Get the absolute path of the election node
    pub fn node_path(&self) -> String {
        format!("/{}", self.election_path)
    }

    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

impl ZkElectConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: ZkElectConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        self.election.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[election]
endpoint = "zk.internal"
port = 2181
session_timeout_ms = 10000
election_path = "master"
host_order_deterministic = true
"#;
        let config = ZkElectConfig::from_str(toml).unwrap();
        assert_eq!(config.election.endpoint, "zk.internal");
        assert_eq!(config.election.connect_string(), "zk.internal:2181");
        assert_eq!(config.election.node_path(), "/master");
        assert!(config.election.host_order_deterministic);
    }

    #[test]
    fn test_defaults() {
        let config = ZkElectConfig::from_str("").unwrap();
        assert_eq!(config.election.endpoint, "zoo1");
        assert_eq!(config.election.port, 2181);
        assert_eq!(config.election.session_timeout_ms, 5000);
        assert_eq!(config.election.election_path, "master");
        assert!(!config.election.host_order_deterministic);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut election = ElectionConfig::default();
        election.port = 0;
        assert!(election.validate().is_err());

        let mut election = ElectionConfig::default();
        election.session_timeout_ms = MAX_SESSION_TIMEOUT_MS + 1;
        assert!(election.validate().is_err());

        let mut election = ElectionConfig::default();
        election.election_path = "a/b".into();
        assert!(election.validate().is_err());

        let mut election = ElectionConfig::default();
        election.election_path = String::new();
        assert!(election.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zkelect.toml");
        std::fs::write(&path, "[election]\nendpoint = \"zk-a\"\n").unwrap();

        let config = ZkElectConfig::from_file(&path).unwrap();
        assert_eq!(config.election.endpoint, "zk-a");
        assert_eq!(config.election.port, 2181);
    }
}
