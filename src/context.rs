//! Render-context bindings.
//!
//! A `Context` is the variable scope a fragment renders against. The engine
//! consults it for live-preview detection, auto-watch variables, and module
//! identity; the template renderer receives it untouched.

use serde_json::{Map, Value};

/// Variable bindings for one render.
#[derive(Debug, Clone, Default)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, convenient when assembling a context inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Truthiness in the loose sense template engines use: absent, null,
    /// `false`, `0`, and the empty string/array all count as false.
    pub fn truthy(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty() && s != "false" && s != "0",
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(_)) => true,
        }
    }

    /// A scalar binding rendered to a string, for identifiers that may be
    /// stored as either strings or numbers.
    pub fn scalar(&self, key: &str) -> Option<String> {
        scalar_string(self.0.get(key)?)
    }

    /// The raw bindings, for renderer implementations.
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Context {
    fn from(bindings: Map<String, Value>) -> Self {
        Self(bindings)
    }
}

/// String form of a scalar JSON value; `None` for everything else.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
