use std::sync::Arc;

use mux_api::formatter::Formatter;
use mux_api::stream::StreamRegistry;
use tokio::sync::mpsc;

use crate::config::{config_values_from_toml, MuxConfig};
use crate::diagnostic::DiagnosticBus;
use crate::error::EngineError;
use crate::multiplexer::{ConsumerSlot, ProducerSlot};
use crate::registry::PluginRegistry;
use crate::subscription::{ProducerHandle, SubscriptionTable};
use crate::Engine;

/// Bounded capacity of each producer's inbound queue — the system's sole
/// backpressure point.
const PRODUCER_INBOX_CAPACITY: usize = 64;
/// Bounded capacity of each consumer's outbound queue, polled
/// non-blockingly by the main loop.
const CONSUMER_OUTBOX_CAPACITY: usize = 64;
/// Control channels only ever carry `Stop`/`RollLog`; a small buffer is
/// enough to never block the sender.
const CONTROL_CAPACITY: usize = 4;
/// Diagnostic bus capacity — generous since it is drained every loop
/// iteration and again in full during shutdown.
const DIAGNOSTIC_BUS_CAPACITY: usize = 1024;

impl Engine {
    /// Bootstrap the engine from parsed configuration and a populated
    /// plugin registry.
    ///
    /// Construction order — formatters, then producers, then consumers —
    /// mirrors `createMultiplexer` in `multiplexer.go`: producers must
    /// exist (and be registered into the subscription table) before
    /// consumers are wired to a pipeline that might reference them only
    /// indirectly through stream ids, and formatters must exist before
    /// any consumer's `modulators` list can be resolved by name.
    ///
    /// Config reload (SIGHUP) is out of scope here — dynamic
    /// reconfiguration is excluded, so binding is one-shot and the bound
    /// config is immutable for the process's
    /// lifetime.
    pub async fn bootstrap(config: MuxConfig, registry: &PluginRegistry) -> Result<Engine, EngineError> {
        let mut streams = StreamRegistry::new();
        let (diagnostic_bus, diagnostic_rx) = DiagnosticBus::new(DIAGNOSTIC_BUS_CAPACITY);

        let mut formatters: std::collections::HashMap<String, Arc<dyn Formatter>> =
            std::collections::HashMap::new();
        for inst in &config.formatters {
            if !inst.enable {
                continue;
            }
            let ctx = format!("formatter '{}'", inst.name);
            let values = config_values_from_toml(&inst.config).map_err(|e| e.with_context(&ctx))?;
            let formatter = registry
                .build_formatter(&inst.class, &values, &diagnostic_bus)
                .map_err(|e| e.with_context(&ctx))?;
            formatters.insert(inst.name.clone(), Arc::from(formatter));
        }

        let mut subscriptions = SubscriptionTable::new();
        let mut producers = Vec::new();

        for inst in &config.producers {
            if !inst.enable {
                continue;
            }
            let ctx = format!("producer '{}'", inst.name);
            let values = config_values_from_toml(&inst.config).map_err(|e| e.with_context(&ctx))?;
            let producer = registry
                .build_producer(&inst.class, &values, &diagnostic_bus)
                .map_err(|e| e.with_context(&ctx))?;

            let (inbox_tx, inbox_rx) = mpsc::channel(PRODUCER_INBOX_CAPACITY);
            let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);

            for stream_name in &inst.streams {
                let stream_id = streams.intern(stream_name);
                subscriptions.subscribe(
                    stream_id,
                    ProducerHandle { producer: producer.clone(), inbox: inbox_tx.clone() },
                );
            }

            let name = inst.name.clone();
            let task_producer = Arc::clone(&producer);
            let handle = tokio::spawn(async move {
                task_producer.produce(inbox_rx, control_rx).await;
                tracing::info!(producer = %name, "producer stopped");
            });

            tracing::info!(producer = %inst.name, class = %inst.class, "spawned producer");
            producers.push(ProducerSlot { name: inst.name.clone(), handle, control_tx });
        }

        let mut consumers = Vec::new();

        for inst in &config.consumers {
            if !inst.enable {
                continue;
            }
            let ctx = format!("consumer '{}'", inst.name);
            let values = config_values_from_toml(&inst.config).map_err(|e| e.with_context(&ctx))?;
            let consumer = registry
                .build_consumer(&inst.class, &values, &diagnostic_bus)
                .map_err(|e| e.with_context(&ctx))?;

            let mut pipeline = Vec::with_capacity(inst.modulators.len());
            for modulator_name in &inst.modulators {
                let formatter = formatters.get(modulator_name).cloned().ok_or_else(|| {
                    EngineError::Config(format!(
                        "{ctx}: modulator '{modulator_name}' is not a configured formatter"
                    ))
                })?;
                pipeline.push(formatter);
            }

            let (outbox_tx, outbox_rx) = mpsc::channel(CONSUMER_OUTBOX_CAPACITY);
            let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);

            let name = inst.name.clone();
            let task_consumer = Arc::clone(&consumer);
            let handle = tokio::spawn(async move {
                task_consumer.consume(outbox_tx, control_rx).await;
                tracing::info!(consumer = %name, "consumer stopped");
            });

            tracing::info!(consumer = %inst.name, class = %inst.class, "spawned consumer");
            consumers.push(ConsumerSlot {
                name: inst.name.clone(),
                handle,
                control_tx,
                outbox_rx,
                pipeline,
            });
        }

        Ok(Engine { diagnostic_bus, diagnostic_rx, subscriptions, consumers, producers })
    }
}
