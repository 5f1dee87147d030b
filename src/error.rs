use thiserror::Error;

/// Errors surfaced by the fragment cache.
///
/// The cache deliberately adds no other failure kinds: a missing `key`
/// parameter degrades to a fallback render, and stale index references are
/// tolerated rather than reported.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing key/value store failed.
    #[error("cache store operation failed: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The template renderer collaborator failed.
    #[error("template rendering failed: {message}")]
    Render { message: String },
    /// A stored entry could not be decoded back into its expected shape.
    #[error("stored cache entry `{key}` is corrupt: {source}")]
    Payload {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(source))
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    pub fn payload(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Payload {
            key: key.into(),
            source,
        }
    }
}
