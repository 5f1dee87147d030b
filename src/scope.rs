//! Per-scope caching directives and the fragment/module variant set.

use sha2::{Digest, Sha256};

use crate::config::PrefixConfig;
use crate::context::Context;
use crate::error::CacheError;
use crate::render::Ttl;
use crate::renderer::TemplateRenderer;
use crate::watch::Watch;

/// The closed set of cache-scope kinds.
///
/// Each kind supplies its own base-key construction, key prefix, and
/// live-preview suffix strategy; everything downstream (key assembly, the
/// payload cache, nesting, the dependency index) is kind-agnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeKind {
    /// An explicitly named region: the call site supplies the key.
    #[default]
    Fragment,
    /// A page-builder block whose identity is structural:
    /// parent entry + block type + block id.
    Module,
}

/// The knobs one cache call site supplies.
#[derive(Debug, Clone, Default)]
pub struct ScopeSpec {
    pub kind: ScopeKind,
    /// Key template (fragment) or optional extra discriminator (module).
    pub key: Option<String>,
    /// Parent entry id; modules fall back to the context `id`.
    pub entry_id: Option<String>,
    /// Per-scope lifetime override.
    pub lifetime: Option<Ttl>,
    pub watch: Watch,
    /// Request parameters that may discriminate this scope's key.
    pub cacheable_params: Vec<String>,
    /// Extra state mixed into the live-preview hash.
    pub live_preview_key: Option<String>,
}

impl ScopeSpec {
    pub fn fragment(key: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Fragment,
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// A fragment scope with no key; cacheable only through the missing-key
    /// fallback path.
    pub fn unkeyed_fragment() -> Self {
        Self::default()
    }

    pub fn module() -> Self {
        Self {
            kind: ScopeKind::Module,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_entry_id(mut self, id: impl Into<String>) -> Self {
        self.entry_id = Some(id.into());
        self
    }

    pub fn with_lifetime(mut self, ttl: Ttl) -> Self {
        self.lifetime = Some(ttl);
        self
    }

    pub fn with_watch(mut self, watch: Watch) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_cacheable_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cacheable_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_live_preview_key(mut self, key: impl Into<String>) -> Self {
        self.live_preview_key = Some(key.into());
        self
    }
}

impl ScopeKind {
    /// The configured key prefix for this kind.
    pub fn prefix<'a>(&self, prefixes: &'a PrefixConfig) -> &'a str {
        match self {
            ScopeKind::Fragment => &prefixes.fragment,
            ScopeKind::Module => &prefixes.module,
        }
    }

    /// Build the base portion of the cache key, or `None` when this scope
    /// cannot be identified (missing key / incomplete module context).
    ///
    /// Fragment keys are templates: `key = "post-{{ id }}"` resolves against
    /// the context, so one call site can cache per entry. Module keys are
    /// derived structurally and degrade to the explicit key when the
    /// structural context is incomplete.
    pub fn base_key(
        &self,
        spec: &ScopeSpec,
        ctx: &Context,
        renderer: &dyn TemplateRenderer,
    ) -> Result<Option<String>, CacheError> {
        match self {
            ScopeKind::Fragment => match &spec.key {
                Some(template) => {
                    let rendered = renderer.render(template, ctx)?;
                    Ok((!rendered.is_empty()).then_some(rendered))
                }
                None => Ok(None),
            },
            ScopeKind::Module => {
                let block_type = ctx.scalar("type");
                let block_id = ctx.scalar("id");
                let parent = spec.entry_id.clone().or_else(|| ctx.scalar("id"));

                match (block_type, block_id, parent) {
                    (Some(block_type), Some(block_id), Some(parent)) => {
                        let discriminator = spec
                            .key
                            .as_deref()
                            .map(|key| format!("{key}:"))
                            .unwrap_or_default();
                        Ok(Some(format!(
                            "{discriminator}{parent}:{block_type}:{block_id}"
                        )))
                    }
                    _ => Ok(spec.key.clone().filter(|key| !key.is_empty())),
                }
            }
        }
    }

    /// The live-preview key suffix for this kind.
    ///
    /// Fragments hash caller-supplied preview state plus the base key, so two
    /// previews of different drafts never share an entry; modules hash their
    /// structural identity.
    pub fn live_preview_suffix(&self, spec: &ScopeSpec, base_key: &str) -> String {
        let seed = match self {
            ScopeKind::Fragment => format!(
                "{}{}",
                spec.live_preview_key.as_deref().unwrap_or_default(),
                base_key
            ),
            ScopeKind::Module => base_key.to_string(),
        };
        format!("live-preview:{}", hex::encode(Sha256::digest(seed)))
    }
}
