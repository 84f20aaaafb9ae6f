use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

use mux_api::config::ConfigValues;
use mux_api::consumer::ControlSignal;
use mux_api::error::PluginError;
use mux_api::message::Message;
use mux_api::producer::Producer;
use mux_api::ConfigParams;
use mux_engine::registry::PluginRegistry;
use tokio::sync::mpsc;

pub const CLASS: &str = "producer.Console";

#[derive(Debug, Default, ConfigParams)]
pub struct ConsoleConfig {
    #[param(description = "Text written before each message's payload")]
    pub prefix: String,
}

/// Writes every accepted message's payload to standard output, one line
/// per message. Reference sink plugin.
pub struct ConsoleProducer {
    prefix: String,
}

impl ConsoleProducer {
    pub fn from_config(values: &ConfigValues) -> Result<Self, PluginError> {
        let cfg = ConsoleConfig::from_config(values)?;
        Ok(Self { prefix: cfg.prefix })
    }

    fn write(&self, message: &Message) {
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "{}{}", self.prefix, String::from_utf8_lossy(message.payload()));
    }
}

impl Producer for ConsoleProducer {
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
                        match message {
                            Some(message) => self.write(&message),
                            None => break,
                        }
                    }
                }
            }
            // Drain whatever is already buffered; no external state to flush.
            while let Ok(message) = inbox.try_recv() {
                self.write(&message);
            }
        })
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_producer(CLASS, |values, _bus| {
        Ok(Arc::new(ConsoleProducer::from_config(values)?) as Arc<dyn Producer>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_api::metadata::Metadata;

    #[tokio::test]
    async fn drains_buffered_messages_after_stop() {
        let producer = Arc::new(ConsoleProducer::from_config(&ConfigValues::new()).unwrap());
        let (inbox_tx, inbox_rx) = mpsc::channel(4);
        let (control_tx, control_rx) = mpsc::channel(1);

        inbox_tx.send(Message::new(b"one".to_vec(), Metadata::new(), vec![])).await.unwrap();
        inbox_tx.send(Message::new(b"two".to_vec(), Metadata::new(), vec![])).await.unwrap();
        control_tx.send(ControlSignal::Stop).await.unwrap();
        drop(inbox_tx);

        let handle = tokio::spawn(producer.produce(inbox_rx, control_rx));
        handle.await.unwrap();
    }
}
