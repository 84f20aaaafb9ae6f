use std::collections::BTreeMap;

use crate::value::Value;

/// Typed key/value store attached to every message.
///
/// Keys may be dotted paths (`"order.id"`) denoting traversal into nested
/// `Value::Map` entries. Reading a missing path never creates intermediate
/// nodes; writing one does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: BTreeMap<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the value at `path`, returning the value and a presence flag.
    ///
    /// `path` is split on `.`; any non-map intermediate node yields
    /// `(None, false)` without creating anything.
    pub fn value(&self, path: &str) -> (Option<&Value>, bool) {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return (None, false);
        };
        let Some(mut current) = self.entries.get(first) else {
            return (None, false);
        };
        for segment in segments {
            match current {
                Value::Map(map) => match map.get(segment) {
                    Some(v) => current = v,
                    None => return (None, false),
                },
                _ => return (None, false),
            }
        }
        (Some(current), true)
    }

    /// Read the value at `key` (no path traversal, top-level only) as its
    /// canonical byte form, converting scalars via their textual form.
    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(Value::to_canonical_bytes)
    }

    /// Write `value` at `path`, creating missing intermediate nodes as maps.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().expect("split always yields at least one segment");

        let mut map = &mut self.entries;
        for segment in segments {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            match entry {
                Value::Map(inner) => map = inner,
                _ => {
                    *entry = Value::Map(BTreeMap::new());
                    match entry {
                        Value::Map(inner) => map = inner,
                        _ => unreachable!(),
                    }
                }
            }
        }
        map.insert(last.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}
