//! Error types for adapter configuration

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Backing file absent at the resolved path
    #[error("{file_name} configuration file doesn't exist.")]
    ConfigurationMissing {
        /// File name that was looked up
        file_name: String,
        /// Resolved path
        path: PathBuf,
    },

    /// I/O failure while opening, reading or parsing the file
    #[error("Error while retrieving the configuration file.")]
    ConfigurationUnreadable {
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The one-time read did not finish within its bound
    #[error("Timed out after {timeout_ms}ms reading {}", path.display())]
    ConfigurationTimeout {
        /// Resolved path
        path: PathBuf,
        /// Bound that elapsed
        timeout_ms: u64,
    },

    /// Required property absent or blank
    #[error("Required property '{0}' is not configured")]
    MissingProperty(String),

    /// Property present but not parseable as the expected type
    #[error("Invalid value '{value}' for property '{key}': {reason}")]
    InvalidValue {
        /// Property key
        key: String,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Whether the failure came from the file being absent
    pub fn is_missing(&self) -> bool {
        matches!(self, ConfigError::ConfigurationMissing { .. })
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(source: std::io::Error) -> Self {
        ConfigError::ConfigurationUnreadable { source }
    }
}
