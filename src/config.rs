//! Cache configuration.
//!
//! One explicit struct passed to the engine at construction; core logic never
//! performs ambient lookups. Loadable with layered precedence (TOML file,
//! then prefixed environment variables):
//!
//! ```toml
//! enabled = true
//! development = false
//! default_duration_secs = 0   # 0 = do not cache unless a scope says so
//!
//! [prefixes]
//! fragment = "cache-fragment"
//! module = "cache-module"
//! dependency_index = "dep-index"
//!
//! [auto_watch]
//! variables = ["children"]
//!
//! [invalidation]
//! enabled = true
//! invalidate_static_cache = true
//! cleanup_strategy = "shallow"
//!
//! [live_preview]
//! detect_using = "context"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! ```

use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::render::Ttl;

const DEFAULT_FRAGMENT_PREFIX: &str = "cache-fragment";
const DEFAULT_MODULE_PREFIX: &str = "cache-module";
const DEFAULT_DEPENDENCY_INDEX_PREFIX: &str = "dep-index";
const DEFAULT_PAGE_BUILDER_BLOCK_FIELD: &str = "modules";
const DEFAULT_LOG_LEVEL: &str = "info";
const ENV_PREFIX: &str = "CIAMBELLA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load cache configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Master configuration for the fragment cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when off every render is a plain render-through and the
    /// store sees no traffic at all.
    pub enabled: bool,
    /// Development mode surfaces a visible diagnostic where production
    /// silently falls back (missing `key` parameter).
    pub development: bool,
    /// Default lifetime in seconds for scopes without an explicit duration.
    /// Zero means such scopes are not cached.
    pub default_duration_secs: u64,
    pub prefixes: PrefixConfig,
    pub auto_watch: AutoWatchConfig,
    pub invalidation: InvalidationConfig,
    pub live_preview: LivePreviewConfig,
    pub logging: LoggingConfig,
}

/// Key prefixes per cache kind, kept distinct so fragment payloads, module
/// payloads, and index entries cannot collide.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrefixConfig {
    pub fragment: String,
    pub module: String,
    pub dependency_index: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoWatchConfig {
    /// Context variables probed for `watch = auto`, in order; the first one
    /// present in the context wins.
    pub variables: Vec<String>,
    /// Name of the page-builder blocks field in host templates. Carried for
    /// host adapters; the engine itself does not consult it.
    pub page_builder_block_field: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvalidationConfig {
    pub enabled: bool,
    /// Also notify the full-page/static cache collaborator on entity change.
    pub invalidate_static_cache: bool,
    pub cleanup_strategy: CleanupStrategy,
}

/// How thoroughly the dependency index is cleaned on eviction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupStrategy {
    /// Evict the payload only. Forward entries under other tags may keep a
    /// stale reference to the evicted key; lookups tolerate that.
    #[default]
    Shallow,
    /// Additionally prune the evicted key out of every forward entry it was
    /// part of, leaving no stale references, at one extra read/write pair per
    /// dependency tag.
    Transitive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LivePreviewConfig {
    pub detect_using: LivePreviewDetect,
}

/// Where to look for the live-preview signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivePreviewDetect {
    /// A truthy `live_preview` variable in the render context.
    #[default]
    Context,
    /// A request header, surfaced as a flag on the render pass.
    Header,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Restrict log output to one target (module path); unset logs all.
    pub channel: Option<String>,
    /// trace|debug|info|warn|error
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            development: false,
            default_duration_secs: 0,
            prefixes: PrefixConfig::default(),
            auto_watch: AutoWatchConfig::default(),
            invalidation: InvalidationConfig::default(),
            live_preview: LivePreviewConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            fragment: DEFAULT_FRAGMENT_PREFIX.to_string(),
            module: DEFAULT_MODULE_PREFIX.to_string(),
            dependency_index: DEFAULT_DEPENDENCY_INDEX_PREFIX.to_string(),
        }
    }
}

impl Default for AutoWatchConfig {
    fn default() -> Self {
        Self {
            variables: vec!["children".to_string()],
            page_builder_block_field: DEFAULT_PAGE_BUILDER_BLOCK_FIELD.to_string(),
        }
    }
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            invalidate_static_cache: true,
            cleanup_strategy: CleanupStrategy::default(),
        }
    }
}

impl Default for LivePreviewConfig {
    fn default() -> Self {
        Self {
            detect_using: LivePreviewDetect::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: None,
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl CacheConfig {
    /// Load with layered precedence: optional TOML file, then environment
    /// variables prefixed `CIAMBELLA_` (double underscore separates nesting,
    /// e.g. `CIAMBELLA_INVALIDATION__CLEANUP_STRATEGY=transitive`).
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// The lifetime applied to scopes with no explicit duration.
    pub fn default_ttl(&self) -> Ttl {
        if self.default_duration_secs == 0 {
            Ttl::Skip
        } else {
            Ttl::For(Duration::from_secs(self.default_duration_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert!(!config.development);
        assert_eq!(config.default_duration_secs, 0);
        assert_eq!(config.prefixes.fragment, "cache-fragment");
        assert_eq!(config.prefixes.module, "cache-module");
        assert_eq!(config.prefixes.dependency_index, "dep-index");
        assert_eq!(config.auto_watch.variables, vec!["children"]);
        assert!(config.invalidation.enabled);
        assert!(config.invalidation.invalidate_static_cache);
        assert_eq!(
            config.invalidation.cleanup_strategy,
            CleanupStrategy::Shallow
        );
        assert_eq!(
            config.live_preview.detect_using,
            LivePreviewDetect::Context
        );
        assert!(config.logging.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn default_ttl_maps_zero_to_skip() {
        let mut config = CacheConfig::default();
        assert_eq!(config.default_ttl(), Ttl::Skip);

        config.default_duration_secs = 60;
        assert_eq!(config.default_ttl(), Ttl::For(Duration::from_secs(60)));
    }

    #[test]
    fn loads_layered_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config file");
        writeln!(
            file,
            r#"
enabled = false
default_duration_secs = 300

[invalidation]
cleanup_strategy = "transitive"

[live_preview]
detect_using = "header"
"#
        )
        .expect("write config");

        let config = CacheConfig::load(Some(file.path())).expect("load config");
        assert!(!config.enabled);
        assert_eq!(config.default_duration_secs, 300);
        assert_eq!(
            config.invalidation.cleanup_strategy,
            CleanupStrategy::Transitive
        );
        assert_eq!(config.live_preview.detect_using, LivePreviewDetect::Header);
        // Untouched sections keep their defaults.
        assert_eq!(config.prefixes.fragment, "cache-fragment");
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = CacheConfig::load(None).expect("load defaults");
        assert!(config.enabled);
        assert_eq!(config.default_duration_secs, 0);
    }
}
