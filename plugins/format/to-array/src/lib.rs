use std::sync::Arc;

use mux_api::config::ConfigValues;
use mux_api::error::PluginError;
use mux_api::formatter::{set_applied_bytes, Formatter, Target};
use mux_api::message::Message;
use mux_api::value::Value;
use mux_api::ConfigParams;
use mux_engine::diagnostic::DiagnosticBus;
use mux_engine::registry::PluginRegistry;

pub const CLASS: &str = "format.ToArray";

const DEFAULT_SEPARATOR: &str = ",";

// ═══════════════════════════════════════════════════════════════
//  ToArrayConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, ConfigParams)]
pub struct ToArrayConfig {
    #[param(description = "Comma-delimited list of metadata keys (paths) to write as a delimited string")]
    pub keys: String,
    #[param(description = "String inserted between each formatted value")]
    pub separator: String,
    #[param(description = "Payload if empty, else a metadata key")]
    pub apply_to: String,
}

impl Default for ToArrayConfig {
    fn default() -> Self {
        Self {
            keys: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            apply_to: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  ToArray
// ═══════════════════════════════════════════════════════════════

/// Renders a fixed list of metadata keys as a delimited string and writes
/// it to the payload or a metadata key. `keys` has no native list
/// representation in `ConfigValues`, so it is carried as a comma-delimited
/// string and split at construction time.
pub struct ToArray {
    keys: Vec<String>,
    separator: String,
    target: Target,
    bus: Arc<DiagnosticBus>,
}

impl ToArray {
    pub fn from_config(values: &ConfigValues, bus: &Arc<DiagnosticBus>) -> Result<Self, PluginError> {
        let cfg = ToArrayConfig::from_config(values)?;
        let keys = cfg
            .keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            keys,
            separator: cfg.separator,
            target: Target::from_config_str(&cfg.apply_to),
            bus: Arc::clone(bus),
        })
    }
}

fn format_value(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(if *b { "t".to_string() } else { "f".to_string() }),
        Value::I64(v) => Some(v.to_string()),
        Value::U64(v) => Some(v.to_string()),
        Value::F64(v) => Some(format!("{v:.6}")),
        Value::Str(s) => Some(s.clone()),
        Value::Bytes(_) | Value::Map(_) | Value::Seq(_) => None,
    }
}

impl Formatter for ToArray {
    fn apply(&self, message: &mut Message) -> Result<(), PluginError> {
        let mut csv = String::new();
        for key in &self.keys {
            let (value, _) = message.metadata().value(key);
            match value {
                Some(value) => match format_value(value) {
                    Some(rendered) => csv.push_str(&rendered),
                    None => {
                        self.bus.warning_with_fields("unsupported datatype", &[("key", key)]);
                    }
                },
                None => {
                    self.bus.warning_with_fields("key not found", &[("key", key)]);
                }
            }
            csv.push_str(&self.separator);
        }
        if !self.separator.is_empty() && csv.len() >= self.separator.len() {
            csv.truncate(csv.len() - self.separator.len());
        }
        set_applied_bytes(message, &self.target, csv.into_bytes());
        Ok(())
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_formatter(CLASS, |values, bus| {
        Ok(Box::new(ToArray::from_config(values, bus)?) as Box<dyn Formatter>)
    });
}
