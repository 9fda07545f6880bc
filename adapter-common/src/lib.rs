//! # Outbound Adapter Common
//!
//! Configuration bootstrap shared by the identity outbound event adapters.
//!
//! ## Resolution
//!
//! ```text
//! $CARBON_HOME
//!   └── repository/conf/identity/identity-outbound-adapter.properties
//!                │
//!                ▼  (read once, bounded)
//!        ConfigurationSet  ──►  ConfigurationProvider::instance()
//! ```
//!
//! The provider is created lazily on first access. Concurrent first callers
//! share a single load; a failed load is not cached and the next caller
//! retries it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod properties;
pub mod provider;
pub mod set;

pub use error::{ConfigError, Result};
pub use provider::{ConfigurationProvider, LazyProvider, LoadOptions};
pub use set::ConfigurationSet;

/// Name of the adapter properties file
pub const CONFIG_FILE_NAME: &str = "identity-outbound-adapter.properties";

/// Environment variable holding the deployment root
pub const CARBON_HOME_ENV: &str = "CARBON_HOME";

/// Directories between the deployment root and the properties file
pub const CONFIG_DIR_SEGMENTS: [&str; 3] = ["repository", "conf", "identity"];

/// Default bound on the one-time configuration read (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Default cap on the configuration file size (bytes)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
