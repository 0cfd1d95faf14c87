//! Canonical state serialization.
//!
//! Graph deduplication and keyed test lookup both identify states by a
//! serialized string key. Two states are equal for graph purposes iff their
//! keys match, so the default serializer must be deterministic: composite
//! values are written with explicitly sorted object keys, never in host map
//! iteration order.

use std::fmt;

use serde::Serialize;

use crate::behavior::EventTagged;

/// Canonical string identity of a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateKey(String);

impl StateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StateKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for StateKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Derives the canonical key for a state.
///
/// A caller-supplied implementation fully replaces the default and becomes
/// the sole identity function for graph nodes and state-test lookup.
pub trait StateSerializer<S, E>: Send + Sync {
    /// `last_event` is the event that produced `state`, when known; the
    /// initial state has none.
    fn serialize(&self, state: &S, last_event: Option<&E>) -> StateKey;
}

impl<S, E, F> StateSerializer<S, E> for F
where
    F: Fn(&S, Option<&E>) -> StateKey + Send + Sync,
{
    fn serialize(&self, state: &S, last_event: Option<&E>) -> StateKey {
        self(state, last_event)
    }
}

/// Default serializer: canonical JSON rendering of the state's structural
/// value, with object keys recursively sorted.
///
/// With [`with_event_tag`](CanonicalSerializer::with_event_tag) the key also
/// includes the tag of the event that produced the state, so two
/// structurally identical states reached via different last events become
/// distinct graph nodes.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSerializer {
    include_event_tag: bool,
}

impl CanonicalSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt in to transition-sensitive deduplication.
    pub fn with_event_tag(mut self) -> Self {
        self.include_event_tag = true;
        self
    }
}

impl<S, E> StateSerializer<S, E> for CanonicalSerializer
where
    S: Serialize,
    E: EventTagged,
{
    fn serialize(&self, state: &S, last_event: Option<&E>) -> StateKey {
        let mut out = match serde_json::to_value(state) {
            Ok(value) => {
                let mut buf = String::new();
                write_canonical(&value, &mut buf);
                buf
            }
            // States are plain data; this only triggers for exotic types
            // (e.g. maps with non-string keys). Keep the error visible in
            // the key rather than silently merging such states.
            Err(err) => format!("<unserializable: {err}>"),
        };

        if self.include_event_tag {
            if let Some(event) = last_event {
                out.push_str(" via ");
                out.push_str(event.tag());
            }
        }

        StateKey(out)
    }
}

/// Write `value` as compact JSON with object keys sorted at every level.
fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Tag(&'static str);

    impl EventTagged for Tag {
        fn tag(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_canonical_sorts_object_keys() {
        let a = serde_json::json!({"b": 1, "a": {"z": true, "y": false}});
        let mut out = String::new();
        write_canonical(&a, &mut out);
        assert_eq!(out, r#"{"a":{"y":false,"z":true},"b":1}"#);
    }

    #[test]
    fn test_key_independent_of_insertion_order() {
        let mut first = serde_json::Map::new();
        first.insert("x".to_string(), serde_json::json!(1));
        first.insert("y".to_string(), serde_json::json!(2));

        let mut second = serde_json::Map::new();
        second.insert("y".to_string(), serde_json::json!(2));
        second.insert("x".to_string(), serde_json::json!(1));

        let serializer = CanonicalSerializer::new();
        let key1: StateKey =
            serializer.serialize(&serde_json::Value::Object(first), None::<&Tag>);
        let key2: StateKey =
            serializer.serialize(&serde_json::Value::Object(second), None::<&Tag>);
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_event_tag_distinguishes_states_when_opted_in() {
        #[derive(Serialize, Clone)]
        struct S {
            name: &'static str,
        }

        let state = S { name: "b" };
        let plain = CanonicalSerializer::new();
        let tagged = CanonicalSerializer::new().with_event_tag();

        let via_x = tagged.serialize(&state, Some(&Tag("X")));
        let via_y = tagged.serialize(&state, Some(&Tag("Y")));
        assert_ne!(via_x, via_y);

        let untagged_x: StateKey = plain.serialize(&state, Some(&Tag("X")));
        let untagged_y: StateKey = plain.serialize(&state, Some(&Tag("Y")));
        assert_eq!(untagged_x, untagged_y);
    }

    #[test]
    fn test_arrays_preserve_order() {
        let serializer = CanonicalSerializer::new();
        let a: StateKey = serializer.serialize(&vec![1, 2, 3], None::<&Tag>);
        let b: StateKey = serializer.serialize(&vec![3, 2, 1], None::<&Tag>);
        assert_ne!(a, b);
    }
}
