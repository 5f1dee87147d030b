//! Dependency watch-list construction.
//!
//! Turns a scope's watch directive plus its render context into the set of
//! dependency tags recorded against the scope's cache key.

use serde_json::Value;

use crate::config::CacheConfig;
use crate::context::{Context, scalar_string};
use crate::deps::DependencyTag;
use crate::error::CacheError;
use crate::renderer::TemplateRenderer;
use crate::scope::ScopeSpec;

/// Watch directive for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Watch {
    /// Watch nothing beyond the implicit parent entry.
    #[default]
    Off,
    /// Resolve tags from the first configured auto-watch variable present in
    /// the context.
    Auto,
    /// A `|`-separated tag list; rendered as a template first, so call sites
    /// can interpolate ids.
    Manual(String),
}

/// Build the dependency tags for a scope, deduplicated, in discovery order.
///
/// Auto-watching probes the configured variables in order and uses the first
/// one present (first-match-wins, even if it yields nothing). Elements
/// without an `id` are skipped; a malformed variable shape is never fatal.
/// The parent entry (explicit `entry_id`, else the context `id`) is always
/// watched when known.
pub fn build_watch_tags(
    spec: &ScopeSpec,
    ctx: &Context,
    config: &CacheConfig,
    renderer: &dyn TemplateRenderer,
) -> Result<Vec<DependencyTag>, CacheError> {
    let mut tags: Vec<DependencyTag> = Vec::new();

    match &spec.watch {
        Watch::Off => {}
        Watch::Auto => {
            for variable in &config.auto_watch.variables {
                if !ctx.contains(variable) {
                    continue;
                }
                if let Some(Value::Array(entries)) = ctx.get(variable) {
                    for entry in entries {
                        if let Some(id) = entry.get("id").and_then(scalar_string) {
                            push_unique(&mut tags, format!("entry:{id}"));
                        }
                    }
                }
                break;
            }
        }
        Watch::Manual(template) => {
            let rendered = renderer.render(template, ctx)?;
            for tag in rendered.split('|').filter(|tag| !tag.is_empty()) {
                push_unique(&mut tags, tag.to_string());
            }
        }
    }

    if let Some(id) = spec.entry_id.clone().or_else(|| ctx.scalar("id")) {
        push_unique(&mut tags, format!("entry:{id}"));
    }

    Ok(tags)
}

fn push_unique(tags: &mut Vec<DependencyTag>, tag: DependencyTag) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct EchoRenderer;

    impl TemplateRenderer for EchoRenderer {
        fn render(&self, template: &str, _ctx: &Context) -> Result<String, CacheError> {
            Ok(template.to_string())
        }
    }

    fn config_watching(variables: &[&str]) -> CacheConfig {
        let mut config = CacheConfig::default();
        config.auto_watch.variables = variables.iter().map(|v| v.to_string()).collect();
        config
    }

    #[test]
    fn off_still_watches_the_parent_entry() {
        let spec = ScopeSpec::fragment("k").with_entry_id("9");
        let tags =
            build_watch_tags(&spec, &Context::new(), &CacheConfig::default(), &EchoRenderer)
                .unwrap();
        assert_eq!(tags, vec!["entry:9"]);
    }

    #[test]
    fn parent_entry_falls_back_to_context_id() {
        let spec = ScopeSpec::fragment("k");
        let ctx = Context::new().with("id", 42);
        let tags =
            build_watch_tags(&spec, &ctx, &CacheConfig::default(), &EchoRenderer).unwrap();
        assert_eq!(tags, vec!["entry:42"]);
    }

    #[test]
    fn auto_watch_uses_first_matching_variable() {
        let spec = ScopeSpec::fragment("k").with_watch(Watch::Auto);
        let ctx = Context::new()
            .with("related", json!([{"id": "1"}, {"id": "2"}]))
            .with("children", json!([{"id": "3"}]));
        let config = config_watching(&["children", "related"]);

        let tags = build_watch_tags(&spec, &ctx, &config, &EchoRenderer).unwrap();
        assert_eq!(tags, vec!["entry:3"]);
    }

    #[test]
    fn auto_watch_first_match_wins_even_when_empty() {
        let spec = ScopeSpec::fragment("k").with_watch(Watch::Auto);
        // `children` is present but yields nothing; `related` must not be probed.
        let ctx = Context::new()
            .with("children", json!([]))
            .with("related", json!([{"id": "1"}]));
        let config = config_watching(&["children", "related"]);

        let tags = build_watch_tags(&spec, &ctx, &config, &EchoRenderer).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn auto_watch_skips_elements_without_ids() {
        let spec = ScopeSpec::fragment("k").with_watch(Watch::Auto);
        let ctx = Context::new().with(
            "children",
            json!([{"id": "1"}, {"title": "no id"}, {"id": 2}]),
        );
        let config = config_watching(&["children"]);

        let tags = build_watch_tags(&spec, &ctx, &config, &EchoRenderer).unwrap();
        assert_eq!(tags, vec!["entry:1", "entry:2"]);
    }

    #[test]
    fn auto_watch_tolerates_non_list_variables() {
        let spec = ScopeSpec::fragment("k").with_watch(Watch::Auto);
        let ctx = Context::new().with("children", "not-a-list");
        let config = config_watching(&["children"]);

        let tags = build_watch_tags(&spec, &ctx, &config, &EchoRenderer).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn manual_watch_splits_and_drops_empty_segments() {
        let spec =
            ScopeSpec::fragment("k").with_watch(Watch::Manual("entry:1||entry:2|".into()));
        let tags =
            build_watch_tags(&spec, &Context::new(), &CacheConfig::default(), &EchoRenderer)
                .unwrap();
        assert_eq!(tags, vec!["entry:1", "entry:2"]);
    }

    #[test]
    fn tags_are_deduplicated() {
        let spec = ScopeSpec::fragment("k")
            .with_watch(Watch::Manual("entry:5|entry:5".into()))
            .with_entry_id("5");
        let tags =
            build_watch_tags(&spec, &Context::new(), &CacheConfig::default(), &EchoRenderer)
                .unwrap();
        assert_eq!(tags, vec!["entry:5"]);
    }
}
