//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use relief_grid_core::{ActorId, DisasterId};
use relief_grid_hub::MessageHub;
use relief_grid_index::ProximityIndex;
use relief_grid_ledger::{ResourceCounter, TaskLedger};
use relief_grid_store::Store;

use crate::auth::TokenVerifier;
use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<S, V>
where
    S: Store,
    V: TokenVerifier,
{
    /// The durable store.
    pub store: Arc<S>,
    /// The message hub for room publish/history/subscribe.
    pub hub: Arc<MessageHub<S>>,
    /// The task ledger.
    pub tasks: Arc<TaskLedger<S>>,
    /// The resource counter.
    pub resources: Arc<ResourceCounter<S>>,
    /// Proximity index over disasters.
    pub disaster_index: Arc<ProximityIndex<DisasterId>>,
    /// Proximity index over contact locations.
    pub contact_index: Arc<ProximityIndex<ActorId>>,
    /// The token verifier for authentication.
    pub verifier: Arc<V>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S, V> GatewayState<S, V>
where
    S: Store + 'static,
    V: TokenVerifier,
{
    /// Create a new gateway state with fresh services over the given store.
    #[must_use]
    pub fn new(store: Arc<S>, verifier: Arc<V>, config: GatewayConfig) -> Self {
        Self {
            hub: Arc::new(MessageHub::with_defaults(Arc::clone(&store))),
            tasks: Arc::new(TaskLedger::new(Arc::clone(&store))),
            resources: Arc::new(ResourceCounter::new(Arc::clone(&store))),
            disaster_index: Arc::new(ProximityIndex::new()),
            contact_index: Arc::new(ProximityIndex::new()),
            store,
            verifier,
            config,
        }
    }

    /// Seed both proximity indexes from the durable store.
    ///
    /// Called once at startup so queries reflect records persisted by
    /// previous runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn seed_indexes(&self) -> relief_grid_store::Result<()> {
        let mut disasters = 0_usize;
        for record in self.store.list_all_disasters()? {
            if self
                .disaster_index
                .upsert(record.disaster_id, record.location, record.submitted_at)
                .is_ok()
            {
                disasters += 1;
            }
        }

        let mut contacts = 0_usize;
        for profile in self.store.list_all_contacts()? {
            if self
                .contact_index
                .upsert(profile.uid.clone(), profile.location, profile.updated_at)
                .is_ok()
            {
                contacts += 1;
            }
        }

        tracing::info!(disasters, contacts, "Proximity indexes seeded");
        Ok(())
    }
}

impl<S, V> Clone for GatewayState<S, V>
where
    S: Store,
    V: TokenVerifier,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hub: Arc::clone(&self.hub),
            tasks: Arc::clone(&self.tasks),
            resources: Arc::clone(&self.resources),
            disaster_index: Arc::clone(&self.disaster_index),
            contact_index: Arc::clone(&self.contact_index),
            verifier: Arc::clone(&self.verifier),
            config: self.config.clone(),
        }
    }
}
