use std::collections::HashMap;
use std::sync::Arc;

use mux_api::config::ConfigValues;
use mux_api::consumer::Consumer;
use mux_api::formatter::Formatter;
use mux_api::producer::Producer;

use crate::diagnostic::DiagnosticBus;
use crate::error::EngineError;

type ConsumerCtor =
    Box<dyn Fn(&ConfigValues, &Arc<DiagnosticBus>) -> Result<Arc<dyn Consumer>, EngineError> + Send + Sync>;
type ProducerCtor =
    Box<dyn Fn(&ConfigValues, &Arc<DiagnosticBus>) -> Result<Arc<dyn Producer>, EngineError> + Send + Sync>;
type FormatterCtor =
    Box<dyn Fn(&ConfigValues, &Arc<DiagnosticBus>) -> Result<Box<dyn Formatter>, EngineError> + Send + Sync>;

/// Maps a plugin class name (e.g. `"format.Trim"`, `"consumer.Stdin"`) to
/// its constructor.
///
/// Replaces capability-based classification (runtime reflection asking
/// "does this type implement the consumer interface?") with explicit
/// registration: each plugin is registered under exactly the role(s) it
/// implements, and the binder looks the class name up directly rather
/// than probing at startup.
#[derive(Default)]
pub struct PluginRegistry {
    consumers: HashMap<String, ConsumerCtor>,
    producers: HashMap<String, ProducerCtor>,
    formatters: HashMap<String, FormatterCtor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_consumer<F>(&mut self, class: impl Into<String>, ctor: F)
    where
        F: Fn(&ConfigValues, &Arc<DiagnosticBus>) -> Result<Arc<dyn Consumer>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.consumers.insert(class.into(), Box::new(ctor));
    }

    pub fn register_producer<F>(&mut self, class: impl Into<String>, ctor: F)
    where
        F: Fn(&ConfigValues, &Arc<DiagnosticBus>) -> Result<Arc<dyn Producer>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.producers.insert(class.into(), Box::new(ctor));
    }

    pub fn register_formatter<F>(&mut self, class: impl Into<String>, ctor: F)
    where
        F: Fn(&ConfigValues, &Arc<DiagnosticBus>) -> Result<Box<dyn Formatter>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.formatters.insert(class.into(), Box::new(ctor));
    }

    pub fn build_consumer(
        &self,
        class: &str,
        config: &ConfigValues,
        bus: &Arc<DiagnosticBus>,
    ) -> Result<Arc<dyn Consumer>, EngineError> {
        let ctor = self
            .consumers
            .get(class)
            .ok_or_else(|| EngineError::UnknownClass(class.to_string()))?;
        ctor(config, bus)
    }

    pub fn build_producer(
        &self,
        class: &str,
        config: &ConfigValues,
        bus: &Arc<DiagnosticBus>,
    ) -> Result<Arc<dyn Producer>, EngineError> {
        let ctor = self
            .producers
            .get(class)
            .ok_or_else(|| EngineError::UnknownClass(class.to_string()))?;
        ctor(config, bus)
    }

    pub fn build_formatter(
        &self,
        class: &str,
        config: &ConfigValues,
        bus: &Arc<DiagnosticBus>,
    ) -> Result<Box<dyn Formatter>, EngineError> {
        let ctor = self
            .formatters
            .get(class)
            .ok_or_else(|| EngineError::UnknownClass(class.to_string()))?;
        ctor(config, bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_api::message::Message;
    use std::future::Future;
    use std::pin::Pin;
    use tokio::sync::mpsc;

    struct NullProducer;
    impl Producer for NullProducer {
        fn produce(
            self: Arc<Self>,
            _inbox: mpsc::Receiver<Message>,
            _control: mpsc::Receiver<mux_api::consumer::ControlSignal>,
        ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(async {})
        }
    }

    #[test]
    fn builds_registered_producer_by_class_name() {
        let mut registry = PluginRegistry::new();
        registry.register_producer("producer.Null", |_cfg, _bus| Ok(Arc::new(NullProducer) as Arc<dyn Producer>));
        let (bus, _rx) = DiagnosticBus::new(8);
        let producer = registry.build_producer("producer.Null", &ConfigValues::new(), &bus);
        assert!(producer.is_ok());
    }

    #[test]
    fn unknown_class_is_an_error() {
        let registry = PluginRegistry::new();
        let (bus, _rx) = DiagnosticBus::new(8);
        let err = registry.build_producer("producer.DoesNotExist", &ConfigValues::new(), &bus);
        assert!(matches!(err, Err(EngineError::UnknownClass(_))));
    }
}
