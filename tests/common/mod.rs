//! Test doubles shared by the integration suites.
#![allow(dead_code)] // each suite uses its own subset

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ciambella::{CacheError, CacheStore, Context, MemoryStore, Retention, TemplateRenderer};
use serde_json::Value;

/// Deterministic stand-in for a template engine.
///
/// - `{{ var }}` / `{{var}}` expand to scalar context bindings;
/// - `@seq` expands to a strictly increasing ordinal, making "fresh on every
///   render" observable;
/// - everything else echoes.
#[derive(Default)]
pub struct StubRenderer {
    seq: AtomicUsize,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn renders(&self) -> usize {
        self.seq.load(Ordering::SeqCst)
    }
}

impl TemplateRenderer for StubRenderer {
    fn render(&self, template: &str, ctx: &Context) -> Result<String, CacheError> {
        let mut out = template.to_string();
        if out.contains("@seq") {
            let n = self.seq.fetch_add(1, Ordering::SeqCst);
            out = out.replace("@seq", &n.to_string());
        }
        for name in ctx.bindings().keys() {
            if let Some(value) = ctx.scalar(name) {
                out = out.replace(&format!("{{{{ {name} }}}}"), &value);
                out = out.replace(&format!("{{{{{name}}}}}"), &value);
            }
        }
        Ok(out)
    }
}

/// Store wrapper whose `forget` fails for selected keys, for exercising
/// per-key eviction isolation.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_forget: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_forget_of(&self, key: &str) {
        self.fail_forget.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }
}

impl CacheStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value, retention: Retention) -> Result<(), CacheError> {
        self.inner.set(key, value, retention)
    }

    fn forget(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_forget.lock().unwrap().contains(key) {
            return Err(CacheError::store(std::io::Error::other(
                "store connection lost",
            )));
        }
        self.inner.forget(key)
    }
}
