//! Process-wide holder for the adapter's shared collaborators
//!
//! Startup code installs the collaborators once and then seals the holder;
//! event handling reads them for the rest of the process. Reads of an unset
//! slot return `None`. Writes after `seal()` are rejected.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    client::ClientManager, config::WebSubAdapterConfiguration, retriever::ResourceRetriever,
    trust_store::TrustStore,
};

static INSTANCE: Lazy<AdapterDataHolder> = Lazy::new(AdapterDataHolder::new);

/// Holder slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Hub HTTP client manager
    ClientManager,
    /// TLS trust store
    TrustStore,
    /// Structured adapter configuration
    AdapterConfiguration,
    /// Key/JWKS retriever
    ResourceRetriever,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::ClientManager => write!(f, "client manager"),
            Slot::TrustStore => write!(f, "trust store"),
            Slot::AdapterConfiguration => write!(f, "adapter configuration"),
            Slot::ResourceRetriever => write!(f, "resource retriever"),
        }
    }
}

/// Holder misuse
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderError {
    /// Write attempted after the holder was sealed
    #[error("Adapter data holder is sealed; cannot replace the {slot}")]
    Sealed {
        /// Slot that was written
        slot: Slot,
    },

    /// Collaborator required but never installed
    #[error("Adapter {slot} has not been set")]
    Unset {
        /// Missing slot
        slot: Slot,
    },
}

/// Fully wired collaborators, for consumers that take dependencies explicitly
#[derive(Debug, Clone)]
pub struct AdapterContext {
    /// Hub HTTP client manager
    pub client_manager: Arc<ClientManager>,
    /// TLS trust store
    pub trust_store: Arc<TrustStore>,
    /// Structured adapter configuration
    pub adapter_configuration: Arc<WebSubAdapterConfiguration>,
    /// Key/JWKS retriever
    pub resource_retriever: Arc<ResourceRetriever>,
}

/// Shared collaborator registry
#[derive(Debug, Default)]
pub struct AdapterDataHolder {
    client_manager: RwLock<Option<Arc<ClientManager>>>,
    trust_store: RwLock<Option<Arc<TrustStore>>>,
    adapter_configuration: RwLock<Option<Arc<WebSubAdapterConfiguration>>>,
    resource_retriever: RwLock<Option<Arc<ResourceRetriever>>>,
    sealed: AtomicBool,
}

impl AdapterDataHolder {
    /// Empty, unsealed holder
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide holder
    pub fn global() -> &'static AdapterDataHolder {
        &INSTANCE
    }

    /// Hub client manager, if installed
    pub fn client_manager(&self) -> Option<Arc<ClientManager>> {
        self.client_manager.read().clone()
    }

    /// Install the hub client manager, returning the one it replaces
    pub fn set_client_manager(
        &self,
        client_manager: Arc<ClientManager>,
    ) -> Result<Option<Arc<ClientManager>>, HolderError> {
        self.replace(&self.client_manager, Slot::ClientManager, client_manager)
    }

    /// Trust store, if installed
    pub fn trust_store(&self) -> Option<Arc<TrustStore>> {
        self.trust_store.read().clone()
    }

    /// Install the trust store, returning the one it replaces
    pub fn set_trust_store(
        &self,
        trust_store: Arc<TrustStore>,
    ) -> Result<Option<Arc<TrustStore>>, HolderError> {
        self.replace(&self.trust_store, Slot::TrustStore, trust_store)
    }

    /// Adapter configuration, if installed
    pub fn adapter_configuration(&self) -> Option<Arc<WebSubAdapterConfiguration>> {
        self.adapter_configuration.read().clone()
    }

    /// Install the adapter configuration, returning the one it replaces
    pub fn set_adapter_configuration(
        &self,
        adapter_configuration: Arc<WebSubAdapterConfiguration>,
    ) -> Result<Option<Arc<WebSubAdapterConfiguration>>, HolderError> {
        self.replace(
            &self.adapter_configuration,
            Slot::AdapterConfiguration,
            adapter_configuration,
        )
    }

    /// Resource retriever, if installed
    pub fn resource_retriever(&self) -> Option<Arc<ResourceRetriever>> {
        self.resource_retriever.read().clone()
    }

    /// Install the resource retriever, returning the one it replaces
    pub fn set_resource_retriever(
        &self,
        resource_retriever: Arc<ResourceRetriever>,
    ) -> Result<Option<Arc<ResourceRetriever>>, HolderError> {
        self.replace(
            &self.resource_retriever,
            Slot::ResourceRetriever,
            resource_retriever,
        )
    }

    /// Reject all further writes.
    ///
    /// Takes every slot's write lock so no in-flight setter lands after
    /// the holder reports itself sealed.
    pub fn seal(&self) {
        let _client_manager = self.client_manager.write();
        let _trust_store = self.trust_store.write();
        let _adapter_configuration = self.adapter_configuration.write();
        let _resource_retriever = self.resource_retriever.write();

        if !self.sealed.swap(true, Ordering::AcqRel) {
            info!("Adapter data holder sealed");
        }
    }

    /// Whether `seal()` has been called
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Snapshot of all four collaborators; fails on the first unset slot.
    ///
    /// All slots are read under their locks at once, in the order `seal()`
    /// takes them, so no single setter can land halfway through the snapshot.
    pub fn context(&self) -> Result<AdapterContext, HolderError> {
        let client_manager = self.client_manager.read();
        let trust_store = self.trust_store.read();
        let adapter_configuration = self.adapter_configuration.read();
        let resource_retriever = self.resource_retriever.read();

        let unset = |slot| HolderError::Unset { slot };
        Ok(AdapterContext {
            client_manager: client_manager
                .clone()
                .ok_or_else(|| unset(Slot::ClientManager))?,
            trust_store: trust_store.clone().ok_or_else(|| unset(Slot::TrustStore))?,
            adapter_configuration: adapter_configuration
                .clone()
                .ok_or_else(|| unset(Slot::AdapterConfiguration))?,
            resource_retriever: resource_retriever
                .clone()
                .ok_or_else(|| unset(Slot::ResourceRetriever))?,
        })
    }

    fn replace<T>(
        &self,
        cell: &RwLock<Option<Arc<T>>>,
        slot: Slot,
        value: Arc<T>,
    ) -> Result<Option<Arc<T>>, HolderError> {
        let mut guard = cell.write();
        if self.is_sealed() {
            return Err(HolderError::Sealed { slot });
        }

        let previous = guard.replace(value);
        debug!(
            "Installed adapter {}{}",
            slot,
            if previous.is_some() { " (replaced)" } else { "" }
        );
        Ok(previous)
    }
}
