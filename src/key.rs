//! Deterministic cache-key construction.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// A fully-built store key for one renderable scope.
///
/// Format: `{prefix}:{locale}:{base}[:live-preview:{hash}][?{k=v&...}]`.
pub type CacheKey = String;

/// Build a cache key, or `None` when `base_key` is empty.
///
/// `None` means "uncacheable", not an error: the caller falls back to a plain
/// render-through. `live_preview_suffix` is pluggable because different
/// fragment kinds hash different state; it is only invoked in live preview.
///
/// The query-string section selects only `cacheable_params` out of
/// `request_params`, emitted in whitelist order so the key is identical no
/// matter how the request ordered them.
pub fn build(
    base_key: &str,
    prefix: &str,
    locale: &str,
    live_preview: bool,
    live_preview_suffix: impl FnOnce() -> String,
    cacheable_params: &[String],
    request_params: &BTreeMap<String, String>,
) -> Option<CacheKey> {
    if base_key.is_empty() {
        return None;
    }

    let mut key = format!("{prefix}:{locale}:{base_key}");
    if live_preview {
        key.push(':');
        key.push_str(&live_preview_suffix());
    }

    let query = select_query(cacheable_params, request_params);
    if !query.is_empty() {
        key.push('?');
        key.push_str(&query);
    }

    Some(key)
}

fn select_query(cacheable_params: &[String], request_params: &BTreeMap<String, String>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for name in cacheable_params {
        if let Some(value) = request_params.get(name) {
            query.append_pair(name, value);
        }
    }
    query.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn no_suffix() -> String {
        unreachable!("suffix must not be invoked outside live preview")
    }

    #[test]
    fn empty_base_is_uncacheable() {
        assert_eq!(
            build("", "frag", "en", false, no_suffix, &[], &params(&[])),
            None
        );
    }

    #[test]
    fn plain_key_shape() {
        let key = build("hero", "frag", "en", false, no_suffix, &[], &params(&[]));
        assert_eq!(key.as_deref(), Some("frag:en:hero"));
    }

    #[test]
    fn live_preview_appends_suffix() {
        let key = build(
            "hero",
            "frag",
            "en",
            true,
            || "live-preview:abc123".to_string(),
            &[],
            &params(&[]),
        );
        assert_eq!(key.as_deref(), Some("frag:en:hero:live-preview:abc123"));
    }

    #[test]
    fn query_uses_whitelist_order_not_request_order() {
        let whitelist = vec!["a".to_string(), "c".to_string()];
        let request = params(&[("c", "3"), ("b", "2"), ("a", "1")]);

        let key = build("hero", "frag", "en", false, no_suffix, &whitelist, &request);
        assert_eq!(key.as_deref(), Some("frag:en:hero?a=1&c=3"));
    }

    #[test]
    fn non_whitelisted_params_do_not_discriminate() {
        let whitelist = vec!["a".to_string()];
        let one = build(
            "hero",
            "frag",
            "en",
            false,
            no_suffix,
            &whitelist,
            &params(&[("a", "1"), ("b", "2")]),
        );
        let two = build(
            "hero",
            "frag",
            "en",
            false,
            no_suffix,
            &whitelist,
            &params(&[("a", "1"), ("b", "other")]),
        );
        assert_eq!(one, two);
    }

    #[test]
    fn absent_whitelisted_params_are_skipped() {
        let whitelist = vec!["a".to_string(), "missing".to_string()];
        let key = build(
            "hero",
            "frag",
            "en",
            false,
            no_suffix,
            &whitelist,
            &params(&[("a", "1")]),
        );
        assert_eq!(key.as_deref(), Some("frag:en:hero?a=1"));
    }

    #[test]
    fn query_values_are_encoded() {
        let whitelist = vec!["q".to_string()];
        let key = build(
            "hero",
            "frag",
            "en",
            false,
            no_suffix,
            &whitelist,
            &params(&[("q", "two words")]),
        );
        assert_eq!(key.as_deref(), Some("frag:en:hero?q=two+words"));
    }
}
