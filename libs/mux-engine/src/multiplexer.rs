use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mux_api::consumer::ControlSignal;
use mux_api::formatter::Formatter;
use mux_api::message::Message;
use mux_api::stream::StreamId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::diagnostic::DiagnosticBus;
use crate::subscription::SubscriptionTable;

pub(crate) struct ConsumerSlot {
    pub name: String,
    pub handle: JoinHandle<()>,
    pub control_tx: mpsc::Sender<ControlSignal>,
    pub outbox_rx: mpsc::Receiver<Message>,
    pub pipeline: Vec<Arc<dyn Formatter>>,
}

pub(crate) struct ProducerSlot {
    pub name: String,
    pub handle: JoinHandle<()>,
    pub control_tx: mpsc::Sender<ControlSignal>,
}

/// The running engine: the subscription table, the spawned consumer and
/// producer tasks, and the diagnostic bus receiver. Built by
/// [`crate::bootstrap`], consumed by [`Engine::run`].
pub struct Engine {
    pub(crate) diagnostic_bus: Arc<DiagnosticBus>,
    pub(crate) diagnostic_rx: mpsc::Receiver<Message>,
    pub(crate) subscriptions: SubscriptionTable,
    pub(crate) consumers: Vec<ConsumerSlot>,
    pub(crate) producers: Vec<ProducerSlot>,
}

impl Engine {
    /// Per-stream send. Clone-and-pin `message` to `stream_id`; for each
    /// producer subscribed to the stream, in insertion order, if it
    /// accepts the clone, enqueue it on its inbound channel. This blocks
    /// if that channel is full — the engine's sole intentional
    /// backpressure point.
    async fn send_message(&self, message: &Message, stream_id: StreamId) {
        let pinned = message.clone_and_pin(stream_id);
        for handle in self.subscriptions.subscribers(stream_id) {
            if handle.producer.accepts(&pinned) {
                let _ = handle.inbox.send(pinned.clone()).await;
            }
        }
    }

    /// Fan a message out to every stream it's addressed to. Non-internal
    /// messages additionally reach the wildcard stream; internal
    /// (diagnostic) messages skip it.
    pub async fn broadcast_message(&self, message: Message) {
        if !message.is_internal() {
            self.send_message(&message, StreamId::WILDCARD).await;
        }
        for stream_id in message.streams().to_vec() {
            self.send_message(&message, stream_id).await;
        }
        message.release();
    }

    /// Run the main loop to completion, then shut down.
    ///
    /// Refuses to start if either side is empty — operator error, reported
    /// back to the caller as `false` so the CLI can exit non-zero — this
    /// just logs and returns. Otherwise: install a termination-signal
    /// watcher, then loop non-blockingly over the signal, the diagnostic
    /// bus, and each consumer in round-robin order — exactly
    /// `multiplexer.go`'s `run()`, translated from goroutine-preemption to
    /// an explicit `yield_now` when a full pass finds no work, so the loop
    /// doesn't peg a core while waiting (tokio tasks are not preemptively
    /// scheduled the way goroutines are).
    ///
    /// Returns `true` if the engine actually started and ran to
    /// completion, `false` if startup validation rejected it.
    pub async fn run(mut self) -> bool {
        if self.consumers.is_empty() {
            eprintln!("Error: No consumers configured.");
            return false;
        }
        if self.producers.is_empty() {
            eprintln!("Error: No producers configured.");
            return false;
        }

        let shutdown_requested = Arc::new(AtomicBool::new(false));
        {
            let shutdown_requested = shutdown_requested.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    shutdown_requested.store(true, Ordering::SeqCst);
                }
            });
        }

        tracing::info!("multiplexer started");

        loop {
            if shutdown_requested.load(Ordering::SeqCst) {
                tracing::info!("termination signal received");
                break;
            }

            let mut did_work = false;

            if let Ok(message) = self.diagnostic_rx.try_recv() {
                self.broadcast_message(message).await;
                did_work = true;
            }

            for i in 0..self.consumers.len() {
                let Ok(mut message) = self.consumers[i].outbox_rx.try_recv() else {
                    continue;
                };
                did_work = true;

                let mut dropped = false;
                for formatter in &self.consumers[i].pipeline {
                    if let Err(e) = formatter.apply(&mut message) {
                        let consumer_name = self.consumers[i].name.clone();
                        self.diagnostic_bus.warning_with_fields(
                            format!("formatter error: {e}"),
                            &[("consumer", consumer_name.as_str())],
                        );
                        dropped = true;
                        break;
                    }
                }

                if !dropped {
                    self.broadcast_message(message).await;
                }
            }

            if !did_work {
                tokio::task::yield_now().await;
            }
        }

        self.shutdown().await;
        true
    }

    /// Ordered shutdown:
    /// 1. Stop every consumer, wait for their task group — no new ingress
    ///    exists once this returns.
    /// 2. Drain the diagnostic bus while producers are still alive,
    ///    broadcasting each message, so consumer-shutdown log lines still
    ///    reach sinks.
    /// 3. Stop every producer, wait for their task group.
    /// 4. Drain any remaining diagnostic messages directly to standard
    ///    output — a last-resort sink because producers are gone.
    ///
    /// Swapping the order of 2 and 3 loses producers' own stopping
    /// messages — that's the subtlety this protocol exists to avoid.
    pub async fn shutdown(mut self) {
        tracing::info!("stopping consumers");
        for slot in &self.consumers {
            let _ = slot.control_tx.send(ControlSignal::Stop).await;
        }
        for slot in self.consumers {
            let _ = slot.handle.await;
        }

        tracing::info!("draining diagnostic bus to live producers");
        while let Ok(message) = self.diagnostic_rx.try_recv() {
            self.broadcast_message(message).await;
        }

        tracing::info!("stopping producers");
        for slot in &self.producers {
            let _ = slot.control_tx.send(ControlSignal::Stop).await;
        }
        for slot in self.producers {
            let _ = slot.handle.await;
        }

        tracing::info!("draining remaining diagnostic messages to stdout");
        while let Ok(message) = self.diagnostic_rx.try_recv() {
            println!("{}", String::from_utf8_lossy(message.payload()));
            message.release();
        }

        tracing::info!("engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_api::message::Message;
    use mux_api::metadata::Metadata;
    use mux_api::stream::StreamRegistry;
    use mux_api::value::Value;
    use std::future::Future;
    use std::pin::Pin;

    struct NullProducer;
    impl mux_api::producer::Producer for NullProducer {
        fn produce(
            self: Arc<Self>,
            _inbox: mpsc::Receiver<Message>,
            _control: mpsc::Receiver<ControlSignal>,
        ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(async {})
        }
    }

    fn engine_with_subscriptions(subscriptions: SubscriptionTable) -> Engine {
        let (diagnostic_bus, diagnostic_rx) = DiagnosticBus::new(8);
        Engine { diagnostic_bus, diagnostic_rx, subscriptions, consumers: Vec::new(), producers: Vec::new() }
    }

    #[tokio::test]
    async fn wildcard_subscriber_receives_non_internal_message_pinned_to_its_own_stream() {
        let mut streams = StreamRegistry::new();
        let s1 = streams.intern("s1");

        let mut subscriptions = SubscriptionTable::new();
        let (inbox_tx, mut inbox_rx) = mpsc::channel(4);
        subscriptions.subscribe(
            StreamId::WILDCARD,
            crate::subscription::ProducerHandle { producer: Arc::new(NullProducer), inbox: inbox_tx },
        );

        let engine = engine_with_subscriptions(subscriptions);
        let message = Message::new(b"hi".to_vec(), Metadata::new(), vec![s1]);
        engine.broadcast_message(message).await;

        let received = inbox_rx.try_recv().expect("wildcard subscriber should receive the message");
        assert_eq!(received.pinned(), StreamId::WILDCARD);
    }

    #[tokio::test]
    async fn internal_message_skips_wildcard_but_reaches_log_subscriber() {
        let mut subscriptions = SubscriptionTable::new();

        let (wildcard_tx, mut wildcard_rx) = mpsc::channel(4);
        subscriptions.subscribe(
            StreamId::WILDCARD,
            crate::subscription::ProducerHandle { producer: Arc::new(NullProducer), inbox: wildcard_tx },
        );
        let (log_tx, mut log_rx) = mpsc::channel(4);
        subscriptions.subscribe(
            StreamId::LOG,
            crate::subscription::ProducerHandle { producer: Arc::new(NullProducer), inbox: log_tx },
        );

        let engine = engine_with_subscriptions(subscriptions);
        let mut metadata = Metadata::new();
        metadata.set("severity", Value::Str("note".to_string()));
        let message = Message::new_internal(b"starting up".to_vec(), metadata, vec![StreamId::LOG]);
        engine.broadcast_message(message).await;

        assert!(wildcard_rx.try_recv().is_err());
        let received = log_rx.try_recv().expect("log subscriber should receive the diagnostic message");
        assert_eq!(received.pinned(), StreamId::LOG);
    }

    #[tokio::test]
    async fn specific_stream_subscriber_receives_exactly_one_clone() {
        let mut streams = StreamRegistry::new();
        let s1 = streams.intern("s1");
        let s2 = streams.intern("s2");

        let mut subscriptions = SubscriptionTable::new();
        let (tx, mut rx) = mpsc::channel(4);
        subscriptions.subscribe(
            s1,
            crate::subscription::ProducerHandle { producer: Arc::new(NullProducer), inbox: tx },
        );

        let engine = engine_with_subscriptions(subscriptions);
        let message = Message::new(b"hi".to_vec(), Metadata::new(), vec![s1]);
        engine.broadcast_message(message).await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "subscriber of s1 must not receive a second clone");

        let unrelated = Message::new(b"other".to_vec(), Metadata::new(), vec![s2]);
        engine.broadcast_message(unrelated).await;
        assert!(rx.try_recv().is_err(), "subscriber of s1 must not receive a message addressed to s2 only");
    }

    /// A consumer that, on `Stop`, publishes a diagnostic note before
    /// returning — simulating the "stopped" log line a real consumer
    /// emits on the way out.
    struct NotingConsumer {
        bus: Arc<DiagnosticBus>,
    }

    impl mux_api::consumer::Consumer for NotingConsumer {
        fn consume(
            self: Arc<Self>,
            _outbox: mpsc::Sender<Message>,
            mut control: mpsc::Receiver<ControlSignal>,
        ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(async move {
                control.recv().await;
                self.bus.note("consumer stopping");
            })
        }
    }

    /// A producer that records every message it receives and, once told
    /// `Stop`, signals `got_stop` and then blocks on `proceed` before
    /// returning — giving a test a rendezvous point strictly between the
    /// engine sending it `Stop` and it actually finishing, so the test can
    /// publish a diagnostic message that can only ever reach it if the
    /// engine (incorrectly) broadcast post-shutdown messages instead of
    /// printing them.
    struct GatedProducer {
        received: std::sync::Mutex<Vec<Vec<u8>>>,
        got_stop_tx: std::sync::Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
        proceed_rx: std::sync::Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
    }

    impl mux_api::producer::Producer for GatedProducer {
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
                                Some(message) => self.received.lock().unwrap().push(message.payload().to_vec()),
                                None => break,
                            }
                        }
                    }
                }
                while let Ok(message) = inbox.try_recv() {
                    self.received.lock().unwrap().push(message.payload().to_vec());
                }

                if let Some(tx) = self.got_stop_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                if let Some(rx) = self.proceed_rx.lock().unwrap().take() {
                    let _ = rx.await;
                }
            })
        }
    }

    #[tokio::test]
    async fn shutdown_delivers_pre_stop_diagnostics_to_the_producer_and_withholds_later_ones() {
        let (bus, diagnostic_rx) = DiagnosticBus::new(8);

        let consumer = Arc::new(NotingConsumer { bus: Arc::clone(&bus) });
        let (consumer_control_tx, consumer_control_rx) = mpsc::channel(4);
        let (outbox_tx, outbox_rx) = mpsc::channel(4);
        let consumer_handle = tokio::spawn(consumer.consume(outbox_tx, consumer_control_rx));

        let (got_stop_tx, got_stop_rx) = tokio::sync::oneshot::channel();
        let (proceed_tx, proceed_rx) = tokio::sync::oneshot::channel();
        let producer = Arc::new(GatedProducer {
            received: std::sync::Mutex::new(Vec::new()),
            got_stop_tx: std::sync::Mutex::new(Some(got_stop_tx)),
            proceed_rx: std::sync::Mutex::new(Some(proceed_rx)),
        });
        let (producer_inbox_tx, producer_inbox_rx) = mpsc::channel(4);
        let (producer_control_tx, producer_control_rx) = mpsc::channel(4);
        let producer_handle = tokio::spawn(Arc::clone(&producer).produce(producer_inbox_rx, producer_control_rx));

        let mut subscriptions = SubscriptionTable::new();
        subscriptions.subscribe(
            StreamId::LOG,
            crate::subscription::ProducerHandle {
                producer: producer.clone() as Arc<dyn mux_api::producer::Producer>,
                inbox: producer_inbox_tx,
            },
        );

        let engine = Engine {
            diagnostic_bus: Arc::clone(&bus),
            diagnostic_rx,
            subscriptions,
            consumers: vec![ConsumerSlot {
                name: "c".to_string(),
                handle: consumer_handle,
                control_tx: consumer_control_tx,
                outbox_rx,
                pipeline: Vec::new(),
            }],
            producers: vec![ProducerSlot {
                name: "p".to_string(),
                handle: producer_handle,
                control_tx: producer_control_tx,
            }],
        };

        let shutdown_handle = tokio::spawn(engine.shutdown());

        // Resolves only once the producer has been told Stop, which only
        // happens after step 2 has fully drained the bus to it — so by
        // this point the consumer's "stopping" note must already have
        // arrived.
        got_stop_rx.await.unwrap();
        assert_eq!(*producer.received.lock().unwrap(), vec![b"consumer stopping".to_vec()]);

        // Published while the producer is stopped but has not yet
        // returned: step 3's drain-to-producer has already happened, so
        // this message can only be picked up by step 4's stdout drain.
        bus.note("after producer stop");

        proceed_tx.send(()).unwrap();
        shutdown_handle.await.unwrap();

        assert_eq!(
            producer.received.lock().unwrap().len(),
            1,
            "a diagnostic published after the producer was stopped must not reach it"
        );
    }
}
