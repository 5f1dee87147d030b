//! Per-render-pass scope stack.
//!
//! One `RenderPass` exists per top-level render and is threaded through
//! every nested cache call. It is deliberately `!Sync` (interior `RefCell`):
//! concurrent render passes each own their stack, so nested caching from
//! parallel requests cannot corrupt each other's placeholder bookkeeping.

use std::cell::RefCell;
use std::collections::BTreeMap;

/// Bookkeeping for one in-flight cache scope.
#[derive(Debug, Default)]
pub(crate) struct ScopeFrame {
    /// Escape-block placeholders registered while this scope generated,
    /// in registration order.
    pub placeholders: Vec<(String, String)>,
}

/// Request-local state for one top-level render.
#[derive(Debug, Default)]
pub struct RenderPass {
    frames: RefCell<Vec<ScopeFrame>>,
    locale: String,
    request_params: BTreeMap<String, String>,
    live_preview_header: bool,
}

impl RenderPass {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Self::default()
        }
    }

    /// Attach the request's query parameters; only whitelisted ones ever
    /// reach a cache key.
    pub fn with_request_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request_params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Mark the request as carrying the live-preview header.
    pub fn with_live_preview_header(mut self, present: bool) -> Self {
        self.live_preview_header = present;
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn request_params(&self) -> &BTreeMap<String, String> {
        &self.request_params
    }

    pub fn live_preview_header(&self) -> bool {
        self.live_preview_header
    }

    /// Depth of currently-executing cache scopes.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub(crate) fn in_scope(&self) -> bool {
        !self.frames.borrow().is_empty()
    }

    /// Enter a scope; the returned guard pops it on every exit path.
    pub(crate) fn enter(&self) -> ScopeGuard<'_> {
        self.frames.borrow_mut().push(ScopeFrame::default());
        ScopeGuard { pass: self }
    }

    /// Register an escape-block placeholder on the innermost active scope.
    /// Returns false when no scope is active.
    pub(crate) fn register_placeholder(&self, token: String, template: String) -> bool {
        match self.frames.borrow_mut().last_mut() {
            Some(frame) => {
                frame.placeholders.push((token, template));
                true
            }
            None => false,
        }
    }

    /// Drain the innermost scope's placeholders (taken into its payload at
    /// the end of generation).
    pub(crate) fn take_placeholders(&self) -> Vec<(String, String)> {
        self.frames
            .borrow_mut()
            .last_mut()
            .map(|frame| std::mem::take(&mut frame.placeholders))
            .unwrap_or_default()
    }

    /// Merge a finished child scope's placeholders into the innermost still
    /// active scope, so an ancestor can refresh a descendant's escape blocks.
    /// Returns false when no parent scope is active.
    pub(crate) fn absorb_placeholders(&self, placeholders: &[(String, String)]) -> bool {
        match self.frames.borrow_mut().last_mut() {
            Some(frame) => {
                frame.placeholders.extend_from_slice(placeholders);
                true
            }
            None => false,
        }
    }
}

/// Pops its scope on drop, keeping the stack balanced even when generation
/// fails midway.
pub(crate) struct ScopeGuard<'a> {
    pass: &'a RenderPass,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.pass.frames.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_balances_push_and_pop() {
        let pass = RenderPass::new("en");
        assert_eq!(pass.depth(), 0);

        {
            let _outer = pass.enter();
            assert_eq!(pass.depth(), 1);
            {
                let _inner = pass.enter();
                assert_eq!(pass.depth(), 2);
            }
            assert_eq!(pass.depth(), 1);
        }
        assert_eq!(pass.depth(), 0);
    }

    #[test]
    fn guard_pops_on_unwind_paths() {
        let pass = RenderPass::new("en");
        let result: Result<(), ()> = (|| {
            let _guard = pass.enter();
            Err(())
        })();
        assert!(result.is_err());
        assert_eq!(pass.depth(), 0);
    }

    #[test]
    fn placeholders_land_on_the_innermost_scope() {
        let pass = RenderPass::new("en");
        let _outer = pass.enter();
        let _inner = pass.enter();

        assert!(pass.register_placeholder("<!--t-->".into(), "tpl".into()));

        // Inner frame holds it; outer frame is untouched.
        let inner_placeholders = pass.take_placeholders();
        assert_eq!(inner_placeholders.len(), 1);
        drop(_inner);
        assert!(pass.take_placeholders().is_empty());
    }

    #[test]
    fn absorb_merges_into_the_parent() {
        let pass = RenderPass::new("en");
        let _outer = pass.enter();

        let child_placeholders = vec![("<!--t-->".to_string(), "tpl".to_string())];
        assert!(pass.absorb_placeholders(&child_placeholders));
        assert_eq!(pass.take_placeholders(), child_placeholders);
    }

    #[test]
    fn no_scope_means_no_registration() {
        let pass = RenderPass::new("en");
        assert!(!pass.register_placeholder("<!--t-->".into(), "tpl".into()));
        assert!(!pass.absorb_placeholders(&[]));
        assert!(pass.take_placeholders().is_empty());
    }
}
