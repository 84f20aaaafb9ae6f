use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use mux_api::config::ConfigValues;
use mux_api::consumer::{Consumer, ControlSignal};
use mux_api::error::PluginError;
use mux_api::message::Message;
use mux_api::metadata::Metadata;
use mux_api::stream::StreamId;
use mux_api::value::Value;
use mux_api::ConfigParams;
use mux_engine::registry::PluginRegistry;
use tokio::sync::mpsc;

pub const CLASS: &str = "consumer.Tick";

const DEFAULT_STREAM: &str = "tick";
const DEFAULT_INTERVAL_MS: u64 = 1000;

#[derive(Debug, ConfigParams)]
pub struct TickConfig {
    #[param(description = "Milliseconds between ticks")]
    pub interval_ms: u64,
    #[param(description = "Stream name each tick is addressed to")]
    pub stream: String,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { interval_ms: DEFAULT_INTERVAL_MS, stream: DEFAULT_STREAM.to_string() }
    }
}

/// Synthetic source emitting one message per `interval_ms`, payload the
/// decimal tick count, metadata `sequence` the same count as an integer.
/// Used for demos and tests that need a self-driving consumer with no
/// external dependency.
pub struct TickConsumer {
    interval: Duration,
    stream: StreamId,
}

impl TickConsumer {
    pub fn from_config(values: &ConfigValues) -> Result<Self, PluginError> {
        let cfg = TickConfig::from_config(values)?;
        if cfg.interval_ms == 0 {
            return Err(PluginError::config("interval_ms must be greater than zero"));
        }
        Ok(Self {
            interval: Duration::from_millis(cfg.interval_ms),
            stream: StreamId::from_name(&cfg.stream),
        })
    }
}

impl Consumer for TickConsumer {
    fn consume(
        self: Arc<Self>,
        outbox: mpsc::Sender<Message>,
        mut control: mpsc::Receiver<ControlSignal>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut ticker = tokio::time::interval(self.interval);
            let mut sequence: i64 = 0;
            loop {
                tokio::select! {
                    signal = control.recv() => {
                        match signal {
                            Some(ControlSignal::Stop) | None => break,
                            Some(ControlSignal::RollLog) => {}
                        }
                    }
                    _ = ticker.tick() => {
                        let mut metadata = Metadata::new();
                        metadata.set("sequence", Value::I64(sequence));
                        let message = Message::new(sequence.to_string().into_bytes(), metadata, vec![self.stream]);
                        sequence += 1;
                        if outbox.send(message).await.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_consumer(CLASS, |values, _bus| {
        Ok(Arc::new(TickConsumer::from_config(values)?) as Arc<dyn Consumer>)
    });
}
