//! # WebSub Hub Outbound Adapter
//!
//! Shared state and bootstrap for the adapter that forwards identity events
//! to a WebSub hub:
//! - Structured adapter configuration built from the deployment properties
//! - TLS trust store for hub and key endpoints
//! - Pooled HTTP client manager
//! - Remote resource retriever for key/JWKS fetching
//! - Process-wide data holder, sealed after startup
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │     ConfigurationProvider (adapter-common)          │
//! └────────────┬────────────────────────────────────────┘
//!              │  bootstrap::activate()
//!     ┌────────┼────────────────┬────────────────┐
//!     │        │                │                │
//! ┌───▼────┐ ┌─▼──────────┐ ┌───▼─────┐ ┌────────▼─────────┐
//! │ Config │ │ TrustStore │ │ Client  │ │ ResourceRetriever│
//! │        │ │            │ │ Manager │ │                  │
//! └───┬────┘ └─┬──────────┘ └───┬─────┘ └────────┬─────────┘
//!     │        │                │                │
//!     └────────┼────────────────┴────────────────┘
//!              │
//! ┌────────────▼─────────────────────────────────────┐
//! │   AdapterDataHolder  ──seal──►  AdapterContext   │
//! └──────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod data_holder;
pub mod error;
pub mod metrics;
pub mod retriever;
pub mod trust_store;

pub use bootstrap::{activate, activate_global, Activation};
pub use client::ClientManager;
pub use config::WebSubAdapterConfiguration;
pub use data_holder::{AdapterContext, AdapterDataHolder, HolderError, Slot};
pub use error::{Error, Result};
pub use retriever::{Resource, ResourceRetriever};
pub use trust_store::TrustStore;

/// Default hub HTTP timeouts (milliseconds)
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 300;

/// Default total connections to the hub
pub const DEFAULT_MAX_CONNECTIONS: usize = 20;

/// Default connections per route
pub const DEFAULT_MAX_CONNECTIONS_PER_ROUTE: usize = 2;

/// Default resource retriever timeouts (milliseconds)
pub const DEFAULT_RETRIEVER_TIMEOUT_MS: u64 = 1_000;

/// Default resource retriever size limit (bytes)
pub const DEFAULT_RETRIEVER_SIZE_LIMIT: usize = 50 * 1024;

/// Default trust bundle, relative to the deployment root
pub const DEFAULT_TRUST_STORE_PATH: &str = "repository/resources/security/client-truststore.pem";
