use std::sync::Arc;

use mux_api::message::Message;
use mux_api::metadata::Metadata;
use mux_api::stream::StreamId;
use mux_api::value::Value;
use tokio::sync::mpsc;

/// Severity of a diagnostic message, stamped into the message's metadata
/// under the `"severity"` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Note,
    Warning,
    Error,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Process-wide bounded channel of self-generated messages, injected into
/// every plugin's constructor rather than reached for as ambient state.
///
/// The writer side never blocks: `publish` uses `try_send`, so a full bus
/// drops the diagnostic message rather than stalling the caller — the bus
/// is meant to be lock-free from the writer's perspective.
/// `DiagnosticBus::new` hands back the matching [`mpsc::Receiver`]
/// separately; only the multiplexer's main loop ever reads from it.
pub struct DiagnosticBus {
    tx: mpsc::Sender<Message>,
}

impl DiagnosticBus {
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self { tx }), rx)
    }

    fn publish(&self, severity: Severity, text: impl Into<String>) {
        let mut metadata = Metadata::new();
        metadata.set("severity", Value::Str(severity.as_str().to_string()));
        let message = Message::new_internal(text.into().into_bytes(), metadata, vec![StreamId::LOG]);
        let _ = self.tx.try_send(message);
    }

    /// Publish with structured fields (plugin class, stream, key).
    fn publish_with_fields(&self, severity: Severity, text: impl Into<String>, fields: &[(&str, &str)]) {
        let mut metadata = Metadata::new();
        metadata.set("severity", Value::Str(severity.as_str().to_string()));
        for (key, value) in fields {
            metadata.set(key, Value::Str((*value).to_string()));
        }
        let message = Message::new_internal(text.into().into_bytes(), metadata, vec![StreamId::LOG]);
        let _ = self.tx.try_send(message);
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.publish(Severity::Debug, text);
    }

    pub fn note(&self, text: impl Into<String>) {
        self.publish(Severity::Note, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.publish(Severity::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.publish(Severity::Error, text);
    }

    /// Warning with structured fields, used when a formatter error drops a
    /// message, carrying the formatter's target key and class name.
    pub fn warning_with_fields(&self, text: impl Into<String>, fields: &[(&str, &str)]) {
        self.publish_with_fields(Severity::Warning, text, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn note_is_marked_internal_and_addressed_to_log_stream() {
        let (bus, mut rx) = DiagnosticBus::new(8);
        bus.note("hello");
        let msg = rx.try_recv().unwrap();
        assert!(msg.is_internal());
        assert_eq!(msg.streams(), &[StreamId::LOG]);
        assert_eq!(msg.payload(), b"hello");
    }

    #[tokio::test]
    async fn publish_never_blocks_when_bus_is_full() {
        let (bus, mut rx) = DiagnosticBus::new(1);
        bus.note("first");
        bus.note("second (dropped, bus full)");
        let first = rx.try_recv().unwrap();
        assert_eq!(first.payload(), b"first");
        assert!(rx.try_recv().is_err());
    }
}
