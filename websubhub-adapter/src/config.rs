//! Structured configuration for the WebSub hub adapter

use adapter_common::{ConfigError, ConfigurationProvider, ConfigurationSet};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    Result, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_CONNECTIONS_PER_ROUTE,
    DEFAULT_RETRIEVER_SIZE_LIMIT, DEFAULT_RETRIEVER_TIMEOUT_MS, DEFAULT_TRUST_STORE_PATH,
};

/// Property keys read from `identity-outbound-adapter.properties`
pub mod keys {
    /// Adapter on/off switch
    pub const ENABLED: &str = "adapter.websubhub.enabled";
    /// Hub base URL
    pub const BASE_URL: &str = "adapter.websubhub.baseUrl";
    /// Hub connect timeout (ms)
    pub const HTTP_CONNECTION_TIMEOUT: &str = "adapter.websubhub.httpConnectionTimeout";
    /// Hub read timeout (ms)
    pub const HTTP_READ_TIMEOUT: &str = "adapter.websubhub.httpReadTimeout";
    /// Wait for a pooled hub connection (ms)
    pub const HTTP_CONNECTION_REQUEST_TIMEOUT: &str =
        "adapter.websubhub.httpConnectionRequestTimeout";
    /// Total hub connections
    pub const MAX_CONNECTIONS: &str = "adapter.websubhub.defaultMaxConnections";
    /// Idle connections kept per route
    pub const MAX_CONNECTIONS_PER_ROUTE: &str = "adapter.websubhub.defaultMaxConnectionsPerRoute";
    /// PEM trust bundle
    pub const TRUST_STORE_PATH: &str = "adapter.websubhub.trustStorePath";
    /// Resource retriever connect timeout (ms)
    pub const RETRIEVER_CONNECT_TIMEOUT: &str =
        "adapter.websubhub.resourceRetriever.connectTimeout";
    /// Resource retriever read timeout (ms)
    pub const RETRIEVER_READ_TIMEOUT: &str = "adapter.websubhub.resourceRetriever.readTimeout";
    /// Resource retriever size limit (bytes)
    pub const RETRIEVER_SIZE_LIMIT: &str = "adapter.websubhub.resourceRetriever.sizeLimit";
}

/// WebSub hub adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSubAdapterConfiguration {
    /// Whether events are forwarded at all
    pub enabled: bool,

    /// Hub base URL (required when enabled)
    pub base_url: Option<String>,

    /// Hub HTTP client settings
    pub http: HttpClientConfig,

    /// PEM trust bundle; relative paths hang off the deployment root
    pub trust_store_path: PathBuf,

    /// Key/JWKS retriever settings
    pub resource_retriever: ResourceRetrieverConfig,
}

impl Default for WebSubAdapterConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            http: HttpClientConfig::default(),
            trust_store_path: PathBuf::from(DEFAULT_TRUST_STORE_PATH),
            resource_retriever: ResourceRetrieverConfig::default(),
        }
    }
}

/// Hub HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Connect timeout (milliseconds)
    pub connection_timeout_ms: u64,

    /// Read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Wait for a free connection (milliseconds)
    pub connection_request_timeout_ms: u64,

    /// Total concurrent hub connections
    pub max_connections: usize,

    /// Idle connections kept per host
    pub max_connections_per_route: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            connection_request_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_connections_per_route: DEFAULT_MAX_CONNECTIONS_PER_ROUTE,
        }
    }
}

impl HttpClientConfig {
    /// Connect timeout
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Pool wait timeout
    pub fn connection_request_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_request_timeout_ms)
    }
}

/// Resource retriever configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRetrieverConfig {
    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Maximum body size (bytes)
    pub size_limit: usize,
}

impl Default for ResourceRetrieverConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_RETRIEVER_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_RETRIEVER_TIMEOUT_MS,
            size_limit: DEFAULT_RETRIEVER_SIZE_LIMIT,
        }
    }
}

impl ResourceRetrieverConfig {
    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl WebSubAdapterConfiguration {
    /// Build from the shared provider
    pub fn from_provider(provider: &ConfigurationProvider) -> Result<Self> {
        Self::from_configuration(provider.configuration())
    }

    /// Build from a raw configuration set; blank values take defaults
    pub fn from_configuration(set: &ConfigurationSet) -> Result<Self> {
        let defaults = Self::default();

        // Anything other than "true" (any case) disables the adapter
        let enabled = set
            .get(keys::ENABLED)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.enabled);
        let base_url = set.get(keys::BASE_URL).map(str::to_string);

        if let Some(url) = &base_url {
            validate_url(keys::BASE_URL, url)?;
        } else if enabled {
            return Err(ConfigError::MissingProperty(keys::BASE_URL.to_string()).into());
        }

        let http = HttpClientConfig {
            connection_timeout_ms: set.get_or(
                keys::HTTP_CONNECTION_TIMEOUT,
                defaults.http.connection_timeout_ms,
            )?,
            read_timeout_ms: set.get_or(keys::HTTP_READ_TIMEOUT, defaults.http.read_timeout_ms)?,
            connection_request_timeout_ms: set.get_or(
                keys::HTTP_CONNECTION_REQUEST_TIMEOUT,
                defaults.http.connection_request_timeout_ms,
            )?,
            max_connections: positive(
                keys::MAX_CONNECTIONS,
                set.get_or(keys::MAX_CONNECTIONS, defaults.http.max_connections)?,
            )?,
            max_connections_per_route: positive(
                keys::MAX_CONNECTIONS_PER_ROUTE,
                set.get_or(
                    keys::MAX_CONNECTIONS_PER_ROUTE,
                    defaults.http.max_connections_per_route,
                )?,
            )?,
        };

        let resource_retriever = ResourceRetrieverConfig {
            connect_timeout_ms: set.get_or(
                keys::RETRIEVER_CONNECT_TIMEOUT,
                defaults.resource_retriever.connect_timeout_ms,
            )?,
            read_timeout_ms: set.get_or(
                keys::RETRIEVER_READ_TIMEOUT,
                defaults.resource_retriever.read_timeout_ms,
            )?,
            size_limit: positive(
                keys::RETRIEVER_SIZE_LIMIT,
                set.get_or(
                    keys::RETRIEVER_SIZE_LIMIT,
                    defaults.resource_retriever.size_limit,
                )?,
            )?,
        };

        let trust_store_path = set
            .get(keys::TRUST_STORE_PATH)
            .map(PathBuf::from)
            .unwrap_or(defaults.trust_store_path);

        Ok(Self {
            enabled,
            base_url,
            http,
            trust_store_path,
            resource_retriever,
        })
    }

    /// Trust bundle location, anchored at `deployment_root` when relative
    pub fn resolved_trust_store_path(&self, deployment_root: &Path) -> PathBuf {
        if self.trust_store_path.is_absolute() {
            self.trust_store_path.clone()
        } else {
            deployment_root.join(&self.trust_store_path)
        }
    }

    /// Parsed hub base URL
    pub fn hub_url(&self) -> Result<Url> {
        let raw = self
            .base_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingProperty(keys::BASE_URL.to_string()))?;
        validate_url(keys::BASE_URL, raw)
    }
}

fn validate_url(key: &str, raw: &str) -> Result<Url> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other)).into()),
    }
}

fn positive(key: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        }
        .into());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn parse(text: &str) -> Result<WebSubAdapterConfiguration> {
        WebSubAdapterConfiguration::from_configuration(&ConfigurationSet::parse(text).unwrap())
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = parse("").unwrap();
        assert_eq!(config, WebSubAdapterConfiguration::default());
        assert!(!config.enabled);
        assert_eq!(config.http.max_connections, 20);
        assert_eq!(config.resource_retriever.size_limit, 51_200);
    }

    #[test]
    fn test_full_configuration() {
        let config = parse(
            "adapter.websubhub.enabled=true\n\
             adapter.websubhub.baseUrl=https://hub.example.org/hub\n\
             adapter.websubhub.httpConnectionTimeout=1000\n\
             adapter.websubhub.httpReadTimeout=2000\n\
             adapter.websubhub.httpConnectionRequestTimeout=500\n\
             adapter.websubhub.defaultMaxConnections=50\n\
             adapter.websubhub.defaultMaxConnectionsPerRoute=10\n\
             adapter.websubhub.trustStorePath=/etc/ssl/hub.pem\n\
             adapter.websubhub.resourceRetriever.sizeLimit=4096\n",
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.base_url.as_deref(), Some("https://hub.example.org/hub"));
        assert_eq!(config.http.connection_timeout(), Duration::from_millis(1000));
        assert_eq!(config.http.read_timeout(), Duration::from_millis(2000));
        assert_eq!(config.http.connection_request_timeout(), Duration::from_millis(500));
        assert_eq!(config.http.max_connections, 50);
        assert_eq!(config.http.max_connections_per_route, 10);
        assert_eq!(config.resource_retriever.size_limit, 4096);
        assert_eq!(
            config.resolved_trust_store_path(Path::new("/opt/is")),
            PathBuf::from("/etc/ssl/hub.pem")
        );
    }

    #[test]
    fn test_enabled_flag_is_lenient() {
        let config =
            parse("adapter.websubhub.enabled=TRUE\nadapter.websubhub.baseUrl=http://hub:9000\n")
                .unwrap();
        assert!(config.enabled);

        let config = parse("adapter.websubhub.enabled=yes\n").unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_blank_values_take_defaults() {
        let config = parse("adapter.websubhub.httpReadTimeout=   \n").unwrap();
        assert_eq!(config.http.read_timeout_ms, 300);
    }

    #[test]
    fn test_enabled_requires_base_url() {
        let err = parse("adapter.websubhub.enabled=true\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingProperty(ref key)) if key == keys::BASE_URL
        ));
    }

    #[test]
    fn test_invalid_values() {
        let err = parse("adapter.websubhub.httpReadTimeout=soon\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { ref key, .. }) if key == keys::HTTP_READ_TIMEOUT
        ));

        let err = parse("adapter.websubhub.baseUrl=ftp://hub.example.org\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));

        let err = parse("adapter.websubhub.defaultMaxConnections=0\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_relative_trust_store_path() {
        let config = parse("").unwrap();
        assert_eq!(
            config.resolved_trust_store_path(Path::new("/opt/is")),
            PathBuf::from("/opt/is/repository/resources/security/client-truststore.pem")
        );
    }
}
