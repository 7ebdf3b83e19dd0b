//! Wire envelopes wrapping collection responses.

use serde_json::Value;

/// Object keys under which a non-paginated collection may be wrapped.
const WRAPPER_KEYS: &[&str] = &["data", "ticks"];

/// Shape of a collection response, resolved once at the fetch boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// The payload is the collection itself.
    Bare(Vec<Value>),
    /// `{ "results": [...], "next": "<url>" | null }`.
    Paginated {
        results: Vec<Value>,
        next: Option<String>,
    },
    /// `{ "data": [...] }` or `{ "ticks": [...] }`.
    Wrapped { key: &'static str, items: Vec<Value> },
    /// Anything else; read as an empty collection.
    Unrecognized,
}

/// Tag of an [`Envelope`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Bare,
    Paginated,
    Wrapped,
    Unrecognized,
}

impl Envelope {
    /// Classify a decoded JSON response.
    pub fn from_value(value: Value) -> Self {
        let mut map = match value {
            Value::Array(items) => return Envelope::Bare(items),
            Value::Object(map) => map,
            _ => return Envelope::Unrecognized,
        };

        if let Some(Value::Array(results)) = map.remove("results") {
            let next = match map.remove("next") {
                Some(Value::String(link)) if !link.trim().is_empty() => Some(link),
                _ => None,
            };
            return Envelope::Paginated { results, next };
        }

        for &key in WRAPPER_KEYS {
            if let Some(Value::Array(items)) = map.remove(key) {
                return Envelope::Wrapped { key, items };
            }
        }

        Envelope::Unrecognized
    }

    pub fn shape(&self) -> Shape {
        match self {
            Envelope::Bare(_) => Shape::Bare,
            Envelope::Paginated { .. } => Shape::Paginated,
            Envelope::Wrapped { .. } => Shape::Wrapped,
            Envelope::Unrecognized => Shape::Unrecognized,
        }
    }

    /// Split into the page items and the link to the following page.
    pub fn into_parts(self) -> (Vec<Value>, Option<String>) {
        match self {
            Envelope::Bare(items) => (items, None),
            Envelope::Paginated { results, next } => (results, next),
            Envelope::Wrapped { items, .. } => (items, None),
            Envelope::Unrecognized => (Vec::new(), None),
        }
    }
}
