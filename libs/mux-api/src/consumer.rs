use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::message::Message;

/// Inbound control signal delivered to a running consumer or producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Stop,
    RollLog,
}

/// Source of messages. The engine constructs one `(outbox, control)` pair
/// of channels per consumer at registration time: `outbox` is the bounded
/// channel the consumer publishes into and the engine polls non-blockingly;
/// `control` is how the engine requests `Stop`.
///
/// On `Stop`, a consumer must stop sourcing new messages, drain any
/// in-flight buffers into `outbox`, and return.
pub trait Consumer: Send + Sync + 'static {
    /// Runs until `control` yields `Stop` or the source is exhausted.
    /// Takes `self` by `Arc` so the engine can hold a second handle if it
    /// ever needs to (symmetric with [`crate::producer::Producer::produce`]).
    fn consume(
        self: std::sync::Arc<Self>,
        outbox: mpsc::Sender<Message>,
        control: mpsc::Receiver<ControlSignal>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}
