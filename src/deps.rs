//! Store-backed bidirectional dependency index.
//!
//! Two mirrored families of entries live in the backing store, both with
//! unbounded lifetime (index entries must outlive the TTL of the payloads
//! they describe):
//!
//! - forward: `{prefix}:{tag}` -> JSON array of cache keys watching `tag`
//! - reverse: `{prefix}:keys:{cache_key}` -> JSON array of tags it watches

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CleanupStrategy;
use crate::error::CacheError;
use crate::key::CacheKey;
use crate::store::{CacheStore, Retention};

/// Opaque identifier for a watched entity, canonically `entity-kind:id`.
pub type DependencyTag = String;

/// Bidirectional tag <-> cache-key index over the external store.
pub struct DependencyIndex {
    store: Arc<dyn CacheStore>,
    prefix: String,
}

impl DependencyIndex {
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn forward_key(&self, tag: &str) -> String {
        format!("{}:{}", self.prefix, tag)
    }

    fn reverse_key(&self, cache_key: &str) -> String {
        format!("{}:keys:{}", self.prefix, cache_key)
    }

    /// Record that `cache_key` depends on `tags`. Idempotent; a key with no
    /// tags is never indexed and can only expire through its own TTL.
    ///
    /// The reverse entry and each forward entry are separate single-key
    /// writes; the store offers no multi-key transaction, so a concurrent
    /// invalidation may observe a partially-registered key. That window is
    /// bounded and self-healing (stale references are tolerated on lookup,
    /// and a missed invalidation lasts at most one TTL).
    pub fn record(&self, cache_key: &CacheKey, tags: &[DependencyTag]) -> Result<(), CacheError> {
        if tags.is_empty() {
            return Ok(());
        }

        self.store.set(
            &self.reverse_key(cache_key),
            Value::from(tags.to_vec()),
            Retention::Forever,
        )?;

        for tag in tags {
            let forward_key = self.forward_key(tag);
            let mut dependents = self.read_list(&forward_key)?;
            if !dependents.contains(cache_key) {
                dependents.push(cache_key.clone());
                self.store
                    .set(&forward_key, Value::from(dependents), Retention::Forever)?;
            }
        }

        debug!(key = %cache_key, tag_count = tags.len(), "recorded dependency tags");
        Ok(())
    }

    /// All cache keys watching `tag`; empty when the tag was never recorded.
    ///
    /// Under the shallow cleanup strategy the result may include keys whose
    /// payload is already gone; callers treat a missing payload as "nothing
    /// to do".
    pub fn dependents_of(&self, tag: &str) -> Result<Vec<CacheKey>, CacheError> {
        self.read_list(&self.forward_key(tag))
    }

    /// Remove the payload for `cache_key`, and under [`CleanupStrategy::Transitive`]
    /// also prune it out of every forward entry it is part of.
    pub fn evict(&self, cache_key: &str, strategy: CleanupStrategy) -> Result<(), CacheError> {
        self.store.forget(cache_key)?;

        if strategy == CleanupStrategy::Transitive {
            self.prune_references(cache_key)?;
        }
        Ok(())
    }

    /// Evict every dependent of `tag`, then drop the tag's own forward entry
    /// (it has been fully drained).
    ///
    /// Evictions are independent: one failure is logged and the rest
    /// continue. Returns the number of keys successfully evicted.
    pub fn invalidate_all(
        &self,
        tag: &str,
        dependents: &[CacheKey],
        strategy: CleanupStrategy,
    ) -> usize {
        let mut evicted = 0;
        for cache_key in dependents {
            match self.evict(cache_key, strategy) {
                Ok(()) => evicted += 1,
                Err(error) => {
                    warn!(key = %cache_key, %error, "failed to evict dependent; continuing");
                }
            }
        }

        if let Err(error) = self.store.forget(&self.forward_key(tag)) {
            warn!(tag, %error, "failed to drop drained forward index entry");
        }
        evicted
    }

    /// Transitive cleanup: walk the reverse entry and rewrite (or delete)
    /// every forward entry referencing the evicted key, then drop the
    /// reverse entry itself. Leaves no stale references anywhere.
    fn prune_references(&self, cache_key: &str) -> Result<(), CacheError> {
        let reverse_key = self.reverse_key(cache_key);
        let tags = self.read_list(&reverse_key)?;

        for tag in &tags {
            let forward_key = self.forward_key(tag);
            let mut dependents = self.read_list(&forward_key)?;
            dependents.retain(|dependent| dependent != cache_key);

            if dependents.is_empty() {
                self.store.forget(&forward_key)?;
            } else {
                self.store
                    .set(&forward_key, Value::from(dependents), Retention::Forever)?;
            }
        }

        self.store.forget(&reverse_key)?;
        Ok(())
    }

    fn read_list(&self, store_key: &str) -> Result<Vec<String>, CacheError> {
        match self.store.get(store_key)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|source| CacheError::payload(store_key, source)),
            None => Ok(Vec::new()),
        }
    }
}
