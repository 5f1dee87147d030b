//! Entity-change driven invalidation.
//!
//! The host's persistence layer emits [`EntityChanged`] events; the listener
//! converts each to a dependency tag, looks up dependents in the index, and
//! evicts them with the configured cleanup strategy. Subscription goes
//! through [`EntityChangeSource`] so the engine carries no compile-time
//! dependency on the host's event system.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::deps::{DependencyIndex, DependencyTag};
use crate::store::CacheStore;

/// A watched entity was persisted.
#[derive(Debug, Clone)]
pub struct EntityChanged {
    /// Entity kind, the tag prefix (`entry`, `asset`, ...).
    pub kind: String,
    /// Persisted entity id; an event without one is ignored.
    pub id: String,
    /// Public address of the entity, for the full-page cache collaborator.
    pub address: Option<String>,
}

impl EntityChanged {
    pub fn entry(id: impl Into<String>) -> Self {
        Self {
            kind: "entry".to_string(),
            id: id.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// The dependency tag this event invalidates.
    pub fn tag(&self) -> DependencyTag {
        format!("{}:{}", self.kind, self.id)
    }
}

/// Receives entity-change events.
pub trait EntityChangeListener: Send + Sync {
    fn entity_changed(&self, event: &EntityChanged);
}

/// The host side of the wiring: whatever emits change events accepts a
/// listener registration.
pub trait EntityChangeSource {
    fn subscribe(&self, listener: Arc<dyn EntityChangeListener>);
}

/// Optional full-page/static cache collaborator.
///
/// Dropping the page belonging to a changed entity is a pass-through side
/// effect; fragment-cache correctness never depends on it.
pub trait StaticCache: Send + Sync {
    fn invalidate_by_address(&self, address: &str);
}

/// Evicts dependent fragments when a watched entity changes.
pub struct InvalidationListener {
    config: CacheConfig,
    index: DependencyIndex,
    static_cache: Option<Arc<dyn StaticCache>>,
}

impl InvalidationListener {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        let index = DependencyIndex::new(store, config.prefixes.dependency_index.clone());
        Self {
            config,
            index,
            static_cache: None,
        }
    }

    pub fn with_static_cache(mut self, static_cache: Arc<dyn StaticCache>) -> Self {
        self.static_cache = Some(static_cache);
        self
    }

    /// Handle one change event. Never fails: per-key eviction errors are
    /// logged and the remaining dependents still get evicted.
    pub fn on_entity_changed(&self, event: &EntityChanged) {
        if !self.config.invalidation.enabled {
            return;
        }
        if event.id.is_empty() {
            return;
        }

        let tag = event.tag();
        match self.index.dependents_of(&tag) {
            Ok(dependents) if dependents.is_empty() => {}
            Ok(dependents) => {
                info!(
                    tag = %tag,
                    dependent_count = dependents.len(),
                    "invalidating fragments for changed entity"
                );
                let evicted = self.index.invalidate_all(
                    &tag,
                    &dependents,
                    self.config.invalidation.cleanup_strategy,
                );
                info!(tag = %tag, evicted, "fragment invalidation complete");
            }
            Err(error) => {
                warn!(tag = %tag, %error, "dependent lookup failed; skipping invalidation");
                return;
            }
        }

        if self.config.invalidation.invalidate_static_cache
            && let Some(static_cache) = &self.static_cache
            && let Some(address) = &event.address
        {
            static_cache.invalidate_by_address(address);
            info!(address = %address, "static cache invalidated for changed entity");
        }
    }
}

impl EntityChangeListener for InvalidationListener {
    fn entity_changed(&self, event: &EntityChanged) {
        self.on_entity_changed(event);
    }
}
