//! Donut cache engine.
//!
//! Coordinates nested cache scopes: an outer cached region may embed inner,
//! independently keyed regions, and either may contain escape blocks whose
//! content is re-rendered on every serve. Stored payloads keep escape
//! placeholders unresolved; only the outermost scope resolves them, on every
//! render, so the final string handed back to the caller is never itself
//! cached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{CacheConfig, LivePreviewDetect};
use crate::context::Context;
use crate::deps::DependencyIndex;
use crate::error::CacheError;
use crate::key;
use crate::payload::{CachePayload, placeholder_token};
use crate::render::{RenderCache, Ttl};
use crate::renderer::TemplateRenderer;
use crate::scope::ScopeSpec;
use crate::stack::RenderPass;
use crate::store::CacheStore;
use crate::watch::build_watch_tags;

/// Fixed lifetime for live-preview entries; previews must never cache long.
pub const LIVE_PREVIEW_TTL: Duration = Duration::from_secs(5);

const MISSING_KEY_BANNER: &str = "<div style=\"background:red;color:#ffffff;padding:40px;\">\
     fragment cache: a `key` parameter is required.</div>";

/// The fragment cache engine.
///
/// One instance serves arbitrarily many concurrent render passes; all
/// per-render state lives on the [`RenderPass`] threaded through each call.
pub struct FragmentCache {
    config: CacheConfig,
    renderer: Arc<dyn TemplateRenderer>,
    payloads: RenderCache,
    index: DependencyIndex,
}

impl FragmentCache {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn CacheStore>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let index = DependencyIndex::new(store.clone(), config.prefixes.dependency_index.clone());
        Self {
            config,
            renderer,
            payloads: RenderCache::new(store),
            index,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn dependency_index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Run one cache scope: serve from the store or generate via `generate`,
    /// then hand back content ready for the caller.
    ///
    /// `generate` receives the engine and the pass so it can open nested
    /// scopes and emit escape blocks; it runs only on a miss. Inside a still
    /// active parent scope the returned content may contain placeholder
    /// tokens (the parent's payload embeds them and the placeholder map is
    /// merged upward); at the outermost scope all tokens are resolved.
    pub fn cache_scope<F>(
        &self,
        pass: &RenderPass,
        spec: &ScopeSpec,
        ctx: &Context,
        generate: F,
    ) -> Result<String, CacheError>
    where
        F: FnOnce(&Self, &RenderPass) -> Result<String, CacheError>,
    {
        if !self.config.enabled {
            return generate(self, pass);
        }

        let live_preview = self.in_live_preview(pass, ctx);

        let base_key = spec.kind.base_key(spec, ctx, self.renderer.as_ref())?;
        let cache_key = base_key.as_deref().and_then(|base| {
            key::build(
                base,
                spec.kind.prefix(&self.config.prefixes),
                pass.locale(),
                live_preview,
                || spec.kind.live_preview_suffix(spec, base),
                &spec.cacheable_params,
                pass.request_params(),
            )
        });
        let Some(cache_key) = cache_key else {
            return self.missing_key_fallback(pass, generate);
        };

        let ttl = self.resolve_ttl(spec, live_preview);
        // Indexing accompanies a payload write: uncached scopes and live
        // previews leave no trace in the dependency index.
        let should_index = !live_preview && ttl != Ttl::Skip;
        let started_at = Instant::now();

        let (payload, hit) = {
            let _scope = pass.enter();
            self.payloads.get_or_compute(&cache_key, ttl, || {
                let content = generate(self, pass)?;
                if should_index {
                    let tags = build_watch_tags(spec, ctx, &self.config, self.renderer.as_ref())?;
                    self.index.record(&cache_key, &tags)?;
                }
                Ok(CachePayload {
                    content,
                    placeholders: pass.take_placeholders(),
                })
            })?
            // _scope drops here: this scope is popped before the payload is
            // handed to whatever invoked it.
        };

        if pass.absorb_placeholders(&payload.placeholders) {
            debug!(
                key = %cache_key,
                hit,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "nested scope returned to parent"
            );
            return Ok(payload.content);
        }

        let content = self.resolve_payload(payload, ctx)?;
        debug!(
            key = %cache_key,
            hit,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "fragment served"
        );
        Ok(content)
    }

    /// An "ignore cache" block: inside an active cache scope this registers
    /// the raw template on the innermost scope and substitutes a unique
    /// placeholder token; outside any scope the template renders immediately.
    pub fn escape_block(
        &self,
        pass: &RenderPass,
        template: &str,
        ctx: &Context,
    ) -> Result<String, CacheError> {
        if pass.in_scope() {
            let token = placeholder_token();
            pass.register_placeholder(token.clone(), template.to_string());
            return Ok(token);
        }
        self.renderer.render(template, ctx)
    }

    /// Replace every placeholder token with a fresh render of its template,
    /// in registration order. Runs at the outermost scope on every serve.
    fn resolve_payload(&self, payload: CachePayload, ctx: &Context) -> Result<String, CacheError> {
        let mut content = payload.content;
        for (token, template) in &payload.placeholders {
            let fresh = self.renderer.render(template, ctx)?;
            content = content.replace(token, &fresh);
        }
        Ok(content)
    }

    fn in_live_preview(&self, pass: &RenderPass, ctx: &Context) -> bool {
        match self.config.live_preview.detect_using {
            LivePreviewDetect::Context => ctx.truthy("live_preview"),
            LivePreviewDetect::Header => pass.live_preview_header(),
        }
    }

    /// Lifetime precedence: live preview pins a short fixed duration; then
    /// the per-scope override; then the configured default; else no caching.
    fn resolve_ttl(&self, spec: &ScopeSpec, live_preview: bool) -> Ttl {
        if live_preview {
            return Ttl::For(LIVE_PREVIEW_TTL);
        }
        spec.lifetime.unwrap_or_else(|| self.config.default_ttl())
    }

    /// A scope that cannot be identified is uncacheable, not an error: warn,
    /// then either surface a diagnostic (development) or silently render
    /// through (production).
    fn missing_key_fallback<F>(&self, pass: &RenderPass, generate: F) -> Result<String, CacheError>
    where
        F: FnOnce(&Self, &RenderPass) -> Result<String, CacheError>,
    {
        warn!("a required `key` parameter was missing or empty; rendering uncached");
        if self.config.development {
            return Ok(MISSING_KEY_BANNER.to_string());
        }
        generate(self, pass)
    }
}
