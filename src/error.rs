//! zkelect Error Types

use thiserror::Error;

/// Result type alias for zkelect operations
pub type Result<T> = std::result::Result<T, Error>;

/// zkelect error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Session errors
    #[error("Connection failed to {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("Connection timeout to {0}")]
    ConnectionTimeout(String),

    #[error("Session expired")]
    SessionExpired,

    // Election errors
    #[error("Claim failed on {path}: {reason}")]
    Claim { path: String, reason: String },

    #[error("Watch failed on {path}: {reason}")]
    Watch { path: String, reason: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error can be retried on a later trigger
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::ConnectionTimeout(_) | Error::Watch { .. }
        )
    }

    /// Check if this error should push a follower back into contention
    ///
    /// A broken watch is treated the same as an absent node: more likely the
    /// symptom of a leader or session failure than a transient glitch.
    pub fn triggers_recontest(&self) -> bool {
        matches!(self, Error::Watch { .. } | Error::SessionExpired)
    }
}
