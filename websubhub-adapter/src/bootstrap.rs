//! Adapter startup: configuration → collaborators → data holder

use adapter_common::ConfigurationProvider;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    client::ClientManager, config::WebSubAdapterConfiguration, data_holder::AdapterDataHolder,
    metrics::ADAPTER_ACTIVATIONS_TOTAL, retriever::ResourceRetriever, trust_store::TrustStore,
    Result,
};

/// Outcome of a successful activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// All collaborators installed; events will be forwarded
    Active,
    /// Adapter switched off; only the configuration was installed
    Disabled,
}

/// Build every collaborator and install it in `holder`, then seal it.
///
/// Relative paths in the configuration are resolved against
/// `deployment_root`. Any failure leaves the holder unsealed.
pub fn activate(
    provider: &ConfigurationProvider,
    holder: &AdapterDataHolder,
    deployment_root: &Path,
) -> Result<Activation> {
    let result = wire(provider, holder, deployment_root);

    match &result {
        Ok(activation) => {
            let outcome = match activation {
                Activation::Active => "active",
                Activation::Disabled => "disabled",
            };
            ADAPTER_ACTIVATIONS_TOTAL.with_label_values(&[outcome]).inc();
        }
        Err(e) => {
            error!("WebSub hub adapter activation failed: {}", e);
            ADAPTER_ACTIVATIONS_TOTAL.with_label_values(&["failed"]).inc();
        }
    }

    result
}

/// `activate` against the process-wide provider and holder
pub fn activate_global() -> Result<Activation> {
    let provider = ConfigurationProvider::instance()?;
    activate(
        &provider,
        AdapterDataHolder::global(),
        &ConfigurationProvider::deployment_root(),
    )
}

fn wire(
    provider: &ConfigurationProvider,
    holder: &AdapterDataHolder,
    deployment_root: &Path,
) -> Result<Activation> {
    let configuration = Arc::new(WebSubAdapterConfiguration::from_provider(provider)?);

    if !configuration.enabled {
        holder.set_adapter_configuration(configuration)?;
        holder.seal();
        info!("WebSub hub adapter is disabled");
        return Ok(Activation::Disabled);
    }

    let trust_store = Arc::new(TrustStore::from_pem_file(
        configuration.resolved_trust_store_path(deployment_root),
    )?);
    let client_manager = Arc::new(ClientManager::new(&configuration, &trust_store)?);
    let resource_retriever = Arc::new(ResourceRetriever::new(
        configuration.resource_retriever.clone(),
        Some(&trust_store),
    )?);

    holder.set_trust_store(trust_store)?;
    holder.set_client_manager(client_manager)?;
    holder.set_resource_retriever(resource_retriever)?;
    holder.set_adapter_configuration(Arc::clone(&configuration))?;
    holder.seal();

    info!(
        "WebSub hub adapter activated for {}",
        configuration.base_url.as_deref().unwrap_or_default()
    );
    Ok(Activation::Active)
}
