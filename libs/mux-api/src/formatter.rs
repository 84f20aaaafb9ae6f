use crate::error::PluginError;
use crate::message::Message;
use crate::value::Value;

/// Where a formatter reads its input from and writes its output to.
///
/// An empty `Target`/`ApplyTo` config string (the default) means `Payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Payload,
    Metadata(String),
}

impl Target {
    pub fn from_config_str(s: &str) -> Self {
        if s.is_empty() {
            Target::Payload
        } else {
            Target::Metadata(s.to_string())
        }
    }
}

/// A transformation applied to a message before fanout. Reads its
/// configuration at construction time (via the plugin registry's config
/// binder); `apply` is the only thing invoked per message.
///
/// An error aborts the pipeline for that message; the engine logs it via
/// the diagnostic bus and drops the message.
pub trait Formatter: Send + Sync {
    fn apply(&self, message: &mut Message) -> Result<(), PluginError>;
}

/// Read the typed value at `target`: the payload (as bytes) if `target` is
/// `Payload`, else the metadata value at that key.
pub fn get_applied_content<'a>(message: &'a Message, target: &Target) -> AppliedContent<'a> {
    match target {
        Target::Payload => AppliedContent::Bytes(message.payload()),
        Target::Metadata(key) => match message.metadata().value(key).0 {
            Some(v) => AppliedContent::Value(v),
            None => AppliedContent::Bytes(&[]),
        },
    }
}

/// Borrowed view of whatever `get_applied_content` found.
pub enum AppliedContent<'a> {
    Bytes(&'a [u8]),
    Value(&'a Value),
}

impl AppliedContent<'_> {
    /// Render to bytes via canonical textual form for non-byte values.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            AppliedContent::Bytes(b) => b.to_vec(),
            AppliedContent::Value(v) => v.to_canonical_bytes(),
        }
    }
}

/// Write `value` at `target`: replaces the payload (re-encoding to
/// canonical textual form if not already bytes) or the metadata entry.
pub fn set_applied_content(message: &mut Message, target: &Target, value: Value) {
    match target {
        Target::Payload => message.set_payload(value.to_canonical_bytes()),
        Target::Metadata(key) => message.metadata_mut().set(key, value),
    }
}

/// Convenience for formatters that only ever produce byte payloads
/// (`Trim`, `MetadataCopy` in append/prepend mode).
pub fn set_applied_bytes(message: &mut Message, target: &Target, bytes: Vec<u8>) {
    set_applied_content(message, target, Value::Bytes(bytes));
}
