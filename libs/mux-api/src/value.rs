use std::collections::BTreeMap;

/// Canonical metadata value. Every variant owns its data, so `Clone` is
/// always a deep clone — cloning a message's metadata for a fanout step
/// can never leave a sibling aliasing the same nested map or byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Nested mapping. Ordered by key for deterministic iteration.
    Map(BTreeMap<String, Value>),
    /// Ordered sequence.
    Seq(Vec<Value>),
}

impl Value {
    /// Convert a scalar to its canonical textual form, as bytes.
    ///
    /// Aggregates (`Map`/`Seq`) have no canonical textual form and convert
    /// to an empty byte string — callers that need their contents should
    /// go through a formatter (e.g. `ToArray`) instead.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bool(b) => if *b { b"t".to_vec() } else { b"f".to_vec() },
            Value::I64(v) => v.to_string().into_bytes(),
            Value::U64(v) => v.to_string().into_bytes(),
            Value::F64(v) => v.to_string().into_bytes(),
            Value::Str(s) => s.clone().into_bytes(),
            Value::Bytes(b) => b.clone(),
            Value::Map(_) | Value::Seq(_) => Vec::new(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Seq(_))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_canonical_forms() {
        assert_eq!(Value::Bool(true).to_canonical_bytes(), b"t");
        assert_eq!(Value::Bool(false).to_canonical_bytes(), b"f");
        assert_eq!(Value::I64(-7).to_canonical_bytes(), b"-7");
        assert_eq!(Value::U64(7).to_canonical_bytes(), b"7");
        assert_eq!(Value::Str("hi".into()).to_canonical_bytes(), b"hi");
    }

    #[test]
    fn clone_is_deep() {
        let mut inner = BTreeMap::new();
        inner.insert("a".to_string(), Value::I64(1));
        let original = Value::Map(inner);
        let mut cloned = original.clone();
        if let Value::Map(ref mut m) = cloned {
            m.insert("b".to_string(), Value::I64(2));
        }
        assert_ne!(original, cloned);
        if let Value::Map(m) = original {
            assert_eq!(m.len(), 1);
        } else {
            panic!("expected map");
        }
    }
}
