use std::collections::HashMap;
use std::sync::Arc;

use mux_api::message::Message;
use mux_api::producer::Producer;
use mux_api::stream::StreamId;
use tokio::sync::mpsc;

/// A registered producer plus the bounded channel feeding its spawned
/// `produce` task. `producer` is kept so the per-stream send can call
/// [`Producer::accepts`] before enqueuing on `inbox`.
#[derive(Clone)]
pub struct ProducerHandle {
    pub producer: Arc<dyn Producer>,
    pub inbox: mpsc::Sender<Message>,
}

/// `stream identifier -> ordered sequence of producer references`. Built
/// once at startup, read-only during `run` — shared without locks.
///
/// Producers are owned by the multiplexer for their lifetime; entries
/// here are clones of the same `Arc<dyn Producer>`/`Sender`, giving a
/// stable, non-owning reference without unsafe pointer bookkeeping.
#[derive(Default)]
pub struct SubscriptionTable {
    table: HashMap<StreamId, Vec<ProducerHandle>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handle` to `stream_id`, in insertion (= config) order.
    pub fn subscribe(&mut self, stream_id: StreamId, handle: ProducerHandle) {
        self.table.entry(stream_id).or_default().push(handle);
    }

    /// Producers subscribed to `stream_id`, in insertion order. Empty
    /// slice if none.
    pub fn subscribers(&self, stream_id: StreamId) -> &[ProducerHandle] {
        self.table.get(&stream_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
