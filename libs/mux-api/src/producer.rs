use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::consumer::ControlSignal;
use crate::message::Message;

/// Sink for messages. The engine owns an `Arc<dyn Producer>` for the
/// producer's lifetime: one clone is kept to call [`Producer::accepts`]
/// from `send_message` before enqueuing, the other is consumed by the
/// spawned `produce` task.
///
/// `inbox` is the bounded inbound queue — bounded capacity is the
/// engine's backpressure point (`send_message` blocks on a full inbox).
/// `control` delivers `Stop`/`RollLog`.
///
/// On `Stop`, a producer drains its inbox (up to an implementation-defined
/// flush deadline), flushes any buffered external state, and returns.
pub trait Producer: Send + Sync + 'static {
    /// Per-message admission predicate. A rejected message is not an
    /// error — it's simply not enqueued.
    fn accepts(&self, message: &Message) -> bool {
        let _ = message;
        true
    }

    fn produce(
        self: Arc<Self>,
        inbox: mpsc::Receiver<Message>,
        control: mpsc::Receiver<ControlSignal>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}
