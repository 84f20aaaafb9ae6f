use mux_api::config::ConfigValues;
use mux_api::error::PluginError;
use mux_api::formatter::{get_applied_content, set_applied_bytes, set_applied_content, AppliedContent, Formatter, Target};
use mux_api::message::Message;
use mux_api::value::Value;
use mux_api::ConfigParams;
use mux_engine::registry::PluginRegistry;

pub const CLASS: &str = "format.MetadataCopy";

// ═══════════════════════════════════════════════════════════════
//  MetadataCopyConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, ConfigParams)]
pub struct MetadataCopyConfig {
    #[param(description = "Source key to copy from; empty = payload")]
    pub key: String,
    #[param(description = "Destination: 'replace', 'append' or 'prepend'")]
    pub mode: String,
    #[param(description = "Bytes inserted between source and destination in append/prepend mode")]
    pub separator: String,
    #[param(description = "Destination key to copy to; empty = payload")]
    pub apply_to: String,
}

impl Default for MetadataCopyConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            mode: "replace".to_string(),
            separator: String::new(),
            apply_to: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MetadataCopy
// ═══════════════════════════════════════════════════════════════

enum Mode {
    Replace,
    Append,
    Prepend,
}

/// Copies content from `key` (source, payload if empty) to `apply_to`
/// (destination, payload if empty) in one of three modes.
pub struct MetadataCopy {
    source: Target,
    destination: Target,
    mode: Mode,
    separator: Vec<u8>,
}

impl MetadataCopy {
    pub fn from_config(values: &ConfigValues) -> Result<Self, PluginError> {
        let cfg = MetadataCopyConfig::from_config(values)?;
        let mode = match cfg.mode.to_lowercase().as_str() {
            "replace" => Mode::Replace,
            "append" => Mode::Append,
            "prepend" => Mode::Prepend,
            other => {
                return Err(PluginError::config(format!(
                    "mode must be one of replace, append or prepend, got '{other}'"
                )))
            }
        };
        Ok(Self {
            source: Target::from_config_str(&cfg.key),
            destination: Target::from_config_str(&cfg.apply_to),
            mode,
            separator: cfg.separator.into_bytes(),
        })
    }
}

impl Formatter for MetadataCopy {
    fn apply(&self, message: &mut Message) -> Result<(), PluginError> {
        match self.mode {
            Mode::Replace => {
                let value = match get_applied_content(message, &self.source) {
                    AppliedContent::Bytes(b) => Value::Bytes(b.to_vec()),
                    AppliedContent::Value(v) => v.clone(),
                };
                set_applied_content(message, &self.destination, value);
            }
            Mode::Append => {
                let src = get_applied_content(message, &self.source).as_bytes();
                let mut dst = get_applied_content(message, &self.destination).as_bytes();
                if !self.separator.is_empty() {
                    dst.extend_from_slice(&self.separator);
                }
                dst.extend_from_slice(&src);
                set_applied_bytes(message, &self.destination, dst);
            }
            Mode::Prepend => {
                let mut src = get_applied_content(message, &self.source).as_bytes();
                let dst = get_applied_content(message, &self.destination).as_bytes();
                if !self.separator.is_empty() {
                    src.extend_from_slice(&self.separator);
                }
                src.extend_from_slice(&dst);
                set_applied_bytes(message, &self.destination, src);
            }
        }
        Ok(())
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_formatter(CLASS, |values, _bus| {
        Ok(Box::new(MetadataCopy::from_config(values)?) as Box<dyn Formatter>)
    });
}
