//! Error types for the WebSub hub adapter

use adapter_common::ConfigError;
use thiserror::Error;

use crate::data_holder::HolderError;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Trust store could not be loaded or applied
    #[error("Trust store error: {0}")]
    TrustStore(String),

    /// Data holder misuse
    #[error(transparent)]
    Holder(#[from] HolderError),

    /// Hub connection pool exhausted
    #[error("No hub connection available within {timeout_ms}ms")]
    PoolTimeout {
        /// Wait bound
        timeout_ms: u64,
    },

    /// Remote endpoint answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Remote resource exceeded the retriever's size limit
    #[error("Resource at {url} exceeds {limit} bytes")]
    ResourceTooLarge {
        /// Requested URL
        url: String,
        /// Configured limit
        limit: usize,
    },

    /// URL could not be parsed or has an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
