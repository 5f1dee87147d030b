//! Ciambella — dependency-aware fragment cache.
//!
//! Memoizes rendered output under deterministic keys, tracks which upstream
//! entities each cached fragment depends on, and evicts affected fragments
//! when an entity changes. Nested ("donut-hole") caching lets designated
//! escape blocks inside a cached region render fresh on every request.
//!
//! ## Collaborators
//!
//! The engine owns no I/O of its own; hosts supply:
//!
//! - a [`CacheStore`] (atomic single-key get/set/forget; [`MemoryStore`] is
//!   bundled),
//! - a [`TemplateRenderer`] for content generation and escape resolution,
//! - optionally an entity-change source and a [`StaticCache`] for full-page
//!   eviction.
//!
//! ## Configuration
//!
//! One [`CacheConfig`] passed at construction:
//!
//! ```toml
//! enabled = true
//! default_duration_secs = 300
//!
//! [invalidation]
//! cleanup_strategy = "shallow"   # or "transitive"
//! ```
//!
//! ## Shape of a render
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ciambella::*;
//! # fn renderer() -> Arc<dyn TemplateRenderer> { unimplemented!() }
//! let engine = FragmentCache::new(CacheConfig::default(), MemoryStore::shared(), renderer());
//! let pass = RenderPass::new("en");
//! let spec = ScopeSpec::fragment("hero").with_lifetime(Ttl::Forever);
//! let html = engine.cache_scope(&pass, &spec, &Context::new(), |engine, pass| {
//!     // generate content; may open nested scopes and escape blocks
//!     engine.escape_block(pass, "{{ now }}", &Context::new())
//! })?;
//! # Ok::<(), CacheError>(())
//! ```

mod config;
mod context;
mod deps;
mod engine;
mod error;
mod invalidate;
mod key;
mod logging;
mod payload;
mod render;
mod renderer;
mod scope;
mod stack;
mod store;
mod watch;

pub use config::{
    AutoWatchConfig, CacheConfig, CleanupStrategy, ConfigError, InvalidationConfig,
    LivePreviewConfig, LivePreviewDetect, LoggingConfig, PrefixConfig,
};
pub use context::Context;
pub use deps::{DependencyIndex, DependencyTag};
pub use engine::{FragmentCache, LIVE_PREVIEW_TTL};
pub use error::CacheError;
pub use invalidate::{
    EntityChangeListener, EntityChangeSource, EntityChanged, InvalidationListener, StaticCache,
};
pub use key::{CacheKey, build as build_cache_key};
pub use logging::init as init_logging;
pub use payload::{CachePayload, PLACEHOLDER_MARKER};
pub use render::{RenderCache, Ttl};
pub use renderer::TemplateRenderer;
pub use scope::{ScopeKind, ScopeSpec};
pub use stack::RenderPass;
pub use store::{CacheStore, MemoryStore, Retention};
pub use watch::Watch;
