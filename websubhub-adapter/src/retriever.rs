//! Remote resource retriever (JWKS and key documents)
//!
//! Bounded GET: connect timeout, read timeout and a hard cap on the body
//! size. Bodies over the cap are abandoned mid-stream.

use bytes::{Bytes, BytesMut};
use reqwest::{header::CONTENT_TYPE, Client, Url};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

use crate::{
    config::ResourceRetrieverConfig,
    metrics::{RESOURCE_FETCH_DURATION, RESOURCE_FETCH_TOTAL},
    trust_store::TrustStore,
    Error, Result,
};

/// Retrieved resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Body bytes
    pub content: Bytes,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
}

impl Resource {
    /// Body as UTF-8 text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// HTTP retriever for remote key material
#[derive(Debug, Clone)]
pub struct ResourceRetriever {
    client: Client,
    config: ResourceRetrieverConfig,
}

impl ResourceRetriever {
    /// Build a retriever; extra CA certificates come from `trust_store`
    pub fn new(config: ResourceRetrieverConfig, trust_store: Option<&TrustStore>) -> Result<Self> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .connect_timeout(config.connect_timeout())
            .timeout(config.connect_timeout() + config.read_timeout());

        if let Some(store) = trust_store {
            for certificate in store.reqwest_certificates()? {
                builder = builder.add_root_certificate(certificate);
            }
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Settings in effect
    pub fn config(&self) -> &ResourceRetrieverConfig {
        &self.config
    }

    /// Fetch `url`
    pub async fn retrieve(&self, url: &str) -> Result<Resource> {
        let start = Instant::now();
        let result = self.fetch(url).await;

        let status = match &result {
            Ok(_) => "success",
            Err(Error::ResourceTooLarge { .. }) => "too_large",
            Err(Error::HttpStatus { .. }) => "http_status",
            Err(_) => "error",
        };
        RESOURCE_FETCH_DURATION
            .with_label_values(&[status])
            .observe(start.elapsed().as_secs_f64());
        RESOURCE_FETCH_TOTAL.with_label_values(&[status]).inc();

        if let Err(e) = &result {
            warn!("Resource retrieval from {} failed: {}", url, e);
        }
        result
    }

    /// Fetch `url` and decode the body as JSON
    pub async fn retrieve_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resource = self.retrieve(url).await?;
        Ok(serde_json::from_slice(&resource.content)?)
    }

    async fn fetch(&self, raw_url: &str) -> Result<Resource> {
        let url =
            Url::parse(raw_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                raw_url,
                url.scheme()
            )));
        }

        let limit = self.config.size_limit;
        let too_large = || Error::ResourceTooLarge {
            url: raw_url.to_string(),
            limit,
        };

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: raw_url.to_string(),
            });
        }

        if matches!(response.content_length(), Some(len) if len > limit as u64) {
            return Err(too_large());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Retrieved {} bytes from {}", body.len(), raw_url);

        Ok(Resource {
            content: body.freeze(),
            content_type,
        })
    }
}
