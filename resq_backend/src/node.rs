use crate::api;
use crate::bootstrap::{self, BootstrapResources};
use crate::config::ResqConfig;
use crate::contacts::ContactsCache;
use crate::events::EventHub;
use crate::store::Store;
use anyhow::Result;

/// Convenience wrapper that bootstraps the backend once and hands out
/// cloned handles for whichever entrypoint (CLI, REST server) needs them.
pub struct ResqNode {
    config: ResqConfig,
    bootstrap: BootstrapResources,
    events: EventHub,
}

impl ResqNode {
    /// Bootstraps all persistent state and wires up the change broadcast.
    pub async fn start(config: ResqConfig) -> Result<Self> {
        let bootstrap = bootstrap::initialize(&config).await?;
        let events = EventHub::new();

        tracing::info!(
            directories_created = ?bootstrap.directories_created,
            store_initialized = bootstrap.store_initialized,
            "resq node initialized"
        );

        Ok(Self {
            config,
            bootstrap,
            events,
        })
    }

    /// Returns a snapshot of the node's reusable handles.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            config: self.config.clone(),
            store: self.bootstrap.store.clone(),
            events: self.events.clone(),
            contacts: self.bootstrap.contacts.clone(),
        }
    }

    /// Runs the REST API server until shutdown.
    pub async fn run_http_server(&self) -> Result<()> {
        let snapshot = self.snapshot();
        api::serve_http(
            snapshot.config,
            snapshot.store,
            snapshot.events,
            snapshot.contacts,
        )
        .await
    }

    /// Returns a clone of the store handle.
    pub fn store(&self) -> Store {
        self.bootstrap.store.clone()
    }

    /// Returns the shared change broadcast.
    pub fn events(&self) -> EventHub {
        self.events.clone()
    }

    /// Returns the hotline directory.
    pub fn contacts(&self) -> ContactsCache {
        self.bootstrap.contacts.clone()
    }
}

/// Cloned handles suitable for consumers that just need read/write access
/// to backend services without owning the entire node struct.
#[derive(Clone)]
pub struct NodeSnapshot {
    pub config: ResqConfig,
    pub store: Store,
    pub events: EventHub,
    pub contacts: ContactsCache,
}
