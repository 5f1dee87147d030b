//! Cached payload shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CacheError;

/// Marker prefix for escape-block placeholder tokens.
///
/// Tokens are HTML comments so an unresolved one degrades invisibly instead
/// of leaking markup to visitors.
pub const PLACEHOLDER_MARKER: &str = "FRAGMENT_ESCAPE";

/// What a fragment scope stores: generated content plus the escape-block
/// templates still to be rendered fresh on every serve.
///
/// `content` may contain placeholder tokens; they are resolved only at the
/// outermost scope, after the payload has been read from (or written to) the
/// store. Placeholders keep registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePayload {
    pub content: String,
    #[serde(default)]
    pub placeholders: Vec<(String, String)>,
}

impl CachePayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            placeholders: Vec::new(),
        }
    }

    /// Serialize for storage. Serialization of this shape cannot fail.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("payload serializes to JSON")
    }

    /// Decode a stored payload; a shape mismatch means the entry is corrupt.
    pub fn from_value(key: &str, value: Value) -> Result<Self, CacheError> {
        serde_json::from_value(value).map_err(|source| CacheError::payload(key, source))
    }
}

/// Mint a unique placeholder token for one escape block.
pub fn placeholder_token() -> String {
    format!("<!--{}_{}-->", PLACEHOLDER_MARKER, Uuid::new_v4())
}
