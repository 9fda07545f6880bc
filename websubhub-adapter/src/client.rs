//! Hub HTTP client manager

use reqwest::{Client, Url};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::{
    config::{HttpClientConfig, WebSubAdapterConfiguration},
    trust_store::TrustStore,
    Error, Result,
};

/// Pooled HTTP client for the WebSub hub.
///
/// Total concurrency is capped at `max_connections`; callers wait up to
/// the connection request timeout for a slot.
#[derive(Debug)]
pub struct ClientManager {
    client: Client,
    hub_url: Url,
    config: HttpClientConfig,
    connections: Arc<Semaphore>,
}

/// A claimed hub connection slot, released on drop
#[derive(Debug)]
pub struct HubConnection {
    client: Client,
    _permit: OwnedSemaphorePermit,
}

impl HubConnection {
    /// Client to issue the request with
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl ClientManager {
    /// Build the hub client trusting only the given store
    pub fn new(
        configuration: &WebSubAdapterConfiguration,
        trust_store: &TrustStore,
    ) -> Result<Self> {
        let hub_url = configuration.hub_url()?;
        let config = configuration.http.clone();

        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .connect_timeout(config.connection_timeout())
            .timeout(config.connection_timeout() + config.read_timeout())
            .pool_max_idle_per_host(config.max_connections_per_route);

        for certificate in trust_store.reqwest_certificates()? {
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder.build()?;

        info!(
            "Hub client ready for {} (max {} connections, {} per route)",
            hub_url, config.max_connections, config.max_connections_per_route
        );

        Ok(Self {
            client,
            hub_url,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            config,
        })
    }

    /// Underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Hub base URL
    pub fn hub_url(&self) -> &Url {
        &self.hub_url
    }

    /// Client settings in effect
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Free connection slots
    pub fn available_connections(&self) -> usize {
        self.connections.available_permits()
    }

    /// Claim a connection slot, waiting at most the connection request timeout
    pub async fn acquire(&self) -> Result<HubConnection> {
        let timeout = self.config.connection_request_timeout();
        let pool_timeout = || Error::PoolTimeout {
            timeout_ms: self.config.connection_request_timeout_ms,
        };

        match tokio::time::timeout(timeout, Arc::clone(&self.connections).acquire_owned()).await {
            Ok(Ok(permit)) => {
                debug!("Hub connection acquired ({} left)", self.available_connections());
                Ok(HubConnection {
                    client: self.client.clone(),
                    _permit: permit,
                })
            }
            // The semaphore is never closed
            Ok(Err(_)) => Err(pool_timeout()),
            Err(_) => {
                warn!(
                    "Timed out after {:?} waiting for a hub connection to {}",
                    timeout, self.hub_url
                );
                Err(pool_timeout())
            }
        }
    }
}
