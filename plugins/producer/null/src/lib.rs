use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mux_api::config::ConfigValues;
use mux_api::consumer::ControlSignal;
use mux_api::error::PluginError;
use mux_api::message::Message;
use mux_api::producer::Producer;
use mux_engine::registry::PluginRegistry;
use tokio::sync::mpsc;

pub const CLASS: &str = "producer.Null";

/// Accepts and discards everything. Reference wildcard sink for tests and
/// demo configs that need a producer without side effects.
pub struct NullProducer;

impl NullProducer {
    pub fn from_config(_values: &ConfigValues) -> Result<Self, PluginError> {
        Ok(Self)
    }
}

impl Producer for NullProducer {
    fn produce(
        self: Arc<Self>,
        mut inbox: mpsc::Receiver<Message>,
        mut control: mpsc::Receiver<ControlSignal>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            loop {
                tokio::select! {
                    signal = control.recv() => {
                        match signal {
                            Some(ControlSignal::Stop) | None => break,
                            Some(ControlSignal::RollLog) => {}
                        }
                    }
                    message = inbox.recv() => {
                        if message.is_none() {
                            break;
                        }
                    }
                }
            }
            while inbox.try_recv().is_ok() {}
        })
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_producer(CLASS, |values, _bus| {
        Ok(Arc::new(NullProducer::from_config(values)?) as Arc<dyn Producer>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_api::metadata::Metadata;

    #[tokio::test]
    async fn accepts_all_and_discards() {
        let producer = Arc::new(NullProducer);
        assert!(producer.accepts(&Message::new(Vec::new(), Metadata::new(), vec![])));

        let (inbox_tx, inbox_rx) = mpsc::channel(4);
        let (control_tx, control_rx) = mpsc::channel(1);
        inbox_tx.send(Message::new(b"discarded".to_vec(), Metadata::new(), vec![])).await.unwrap();
        control_tx.send(ControlSignal::Stop).await.unwrap();
        drop(inbox_tx);

        let handle = tokio::spawn(producer.produce(inbox_rx, control_rx));
        handle.await.unwrap();
    }
}
