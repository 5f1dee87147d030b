//! Get-or-compute payload cache.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::payload::CachePayload;
use crate::store::{CacheStore, Retention};

const METRIC_HITS: &str = "fragment_cache_hits_total";
const METRIC_MISSES: &str = "fragment_cache_misses_total";
const METRIC_GENERATE_MS: &str = "fragment_cache_generate_ms";

/// Lifetime directive for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Do not cache: compute runs on every call and nothing is written.
    Skip,
    /// Cache for a bounded duration.
    For(std::time::Duration),
    /// Cache until explicitly evicted.
    Forever,
}

/// Read-through wrapper around content generation.
///
/// A successful read short-circuits `compute`; a failed `compute` writes
/// nothing and propagates, so no partial payload can be persisted.
pub struct RenderCache {
    store: Arc<dyn CacheStore>,
}

impl RenderCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Returns the payload plus whether it was served from the store.
    pub fn get_or_compute<F>(
        &self,
        key: &str,
        ttl: Ttl,
        compute: F,
    ) -> Result<(CachePayload, bool), CacheError>
    where
        F: FnOnce() -> Result<CachePayload, CacheError>,
    {
        let retention = match ttl {
            Ttl::Skip => {
                debug!(key, outcome = "bypass", "caching disabled for scope");
                return Ok((compute()?, false));
            }
            Ttl::For(duration) => Retention::For(duration),
            Ttl::Forever => Retention::Forever,
        };

        if let Some(stored) = self.store.get(key)? {
            debug!(key, outcome = "hit", "serving cached fragment");
            counter!(METRIC_HITS).increment(1);
            return Ok((CachePayload::from_value(key, stored)?, true));
        }

        info!(key, outcome = "miss", "generating fresh fragment");
        counter!(METRIC_MISSES).increment(1);

        let started_at = Instant::now();
        let payload = compute()?;
        histogram!(METRIC_GENERATE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        self.store.set(key, payload.to_value(), retention)?;
        Ok((payload, false))
    }
}
