//! Template renderer collaborator.

use crate::context::Context;
use crate::error::CacheError;

/// The host's template engine.
///
/// The cache never interprets template text itself; it hands raw fragments to
/// this collaborator for initial generation fallbacks, key templates, watch
/// templates, and escape-block resolution.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Context) -> Result<String, CacheError>;
}
