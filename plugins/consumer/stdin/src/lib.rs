use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mux_api::config::ConfigValues;
use mux_api::consumer::{Consumer, ControlSignal};
use mux_api::error::PluginError;
use mux_api::message::Message;
use mux_api::metadata::Metadata;
use mux_api::pool::SlabPool;
use mux_api::stream::StreamId;
use mux_api::ConfigParams;
use mux_engine::registry::PluginRegistry;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

pub const CLASS: &str = "consumer.Stdin";

const DEFAULT_STREAM: &str = "stdin";
const READ_CHUNK: usize = 4096;
const POOL_CAPACITY: usize = 8;

#[derive(Debug, ConfigParams)]
pub struct StdinConfig {
    #[param(description = "Stream name each read line is addressed to")]
    pub stream: String,
}

impl Default for StdinConfig {
    fn default() -> Self {
        Self { stream: DEFAULT_STREAM.to_string() }
    }
}

/// Reads newline-delimited payloads from standard input, one message per
/// line. Read buffers are drawn from a [`SlabPool`] instead of
/// allocating fresh on every read, the idiomatic-Rust home for the slab
/// allocator the source ties to message payloads directly.
pub struct StdinConsumer {
    stream: StreamId,
    pool: SlabPool,
}

impl StdinConsumer {
    pub fn from_config(values: &ConfigValues) -> Result<Self, PluginError> {
        let cfg = StdinConfig::from_config(values)?;
        Ok(Self { stream: StreamId::from_name(&cfg.stream), pool: SlabPool::new(POOL_CAPACITY) })
    }

    fn make_message(&self, line: Vec<u8>) -> Message {
        Message::new(line, Metadata::new(), vec![self.stream])
    }
}

fn split_lines(carry: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(pos) = carry.iter().position(|&b| b == b'\n') {
        let mut line: Vec<u8> = carry.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        lines.push(line);
    }
    lines
}

impl Consumer for StdinConsumer {
    fn consume(
        self: Arc<Self>,
        outbox: mpsc::Sender<Message>,
        mut control: mpsc::Receiver<ControlSignal>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut stdin = tokio::io::stdin();
            let mut carry: Vec<u8> = Vec::new();

            'outer: loop {
                let mut buf = self.pool.acquire(READ_CHUNK);
                buf.resize(READ_CHUNK, 0);

                tokio::select! {
                    signal = control.recv() => {
                        match signal {
                            Some(ControlSignal::Stop) | None => break,
                            Some(ControlSignal::RollLog) => {}
                        }
                    }
                    result = stdin.read(&mut buf) => {
                        match result {
                            Ok(0) => break,
                            Ok(n) => {
                                carry.extend_from_slice(&buf[..n]);
                                for line in split_lines(&mut carry) {
                                    if outbox.send(self.make_message(line)).await.is_err() {
                                        break 'outer;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "stdin consumer read error");
                                break;
                            }
                        }
                    }
                }
            }

            if !carry.is_empty() {
                let _ = outbox.send(self.make_message(carry)).await;
            }
        })
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_consumer(CLASS, |values, _bus| {
        Ok(Arc::new(StdinConsumer::from_config(values)?) as Arc<dyn Consumer>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stream_matches_configured_name() {
        let consumer = StdinConsumer::from_config(&ConfigValues::new()).unwrap();
        assert_eq!(consumer.stream, StreamId::from_name(DEFAULT_STREAM));
    }

    #[test]
    fn splits_on_newline_keeping_partial_line_in_carry() {
        let mut carry = b"one\ntwo\nthre".to_vec();
        let lines = split_lines(&mut carry);
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(carry, b"thre");
    }

    #[test]
    fn strips_trailing_carriage_return() {
        let mut carry = b"one\r\n".to_vec();
        let lines = split_lines(&mut carry);
        assert_eq!(lines, vec![b"one".to_vec()]);
    }
}
