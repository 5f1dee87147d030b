//! Key/value store collaborator.
//!
//! The cache assumes an external store with atomic single-key get/set/forget
//! and no multi-key transactions. `MemoryStore` is the bundled in-process
//! implementation; hosts with a shared backend implement [`CacheStore`] over
//! their own client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::error::CacheError;

/// How long a stored entry lives.
///
/// `Forever` (no auto-expiry) is deliberately distinct from "do not cache",
/// which never reaches the store at all — see [`crate::render::Ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    For(Duration),
    Forever,
}

/// External key/value store.
///
/// Implementations must be shareable across concurrent render passes; each
/// pass keeps its own scope state, the store is the only shared surface.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    fn set(&self, key: &str, value: Value, retention: Retention) -> Result<(), CacheError>;
    fn forget(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process TTL-aware store.
///
/// Expired entries are dropped lazily on the next read.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Whether a live (non-expired) entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) => !entry.expired(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Lazy expiry: the guard above must be released before removal.
        self.entries.remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: Value, retention: Retention) -> Result<(), CacheError> {
        let expires_at = match retention {
            Retention::For(ttl) => Some(Instant::now() + ttl),
            Retention::Forever => None,
        };
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
