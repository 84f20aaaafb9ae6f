use mux_api::config::ConfigValues;
use mux_api::error::PluginError;
use mux_api::formatter::{get_applied_content, set_applied_bytes, Formatter, Target};
use mux_api::message::Message;
use mux_api::ConfigParams;
use mux_engine::registry::PluginRegistry;

pub const CLASS: &str = "format.Trim";

const DEFAULT_SEPARATOR: &str = " \t\r\n";

// ═══════════════════════════════════════════════════════════════
//  TrimConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, ConfigParams)]
pub struct TrimConfig {
    #[param(description = "Characters trimmed from the left of the target content")]
    pub left_separator: String,
    #[param(description = "Characters trimmed from the right of the target content")]
    pub right_separator: String,
    #[param(description = "Payload if empty, else a metadata key")]
    pub target: String,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            left_separator: DEFAULT_SEPARATOR.to_string(),
            right_separator: DEFAULT_SEPARATOR.to_string(),
            target: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Trim
// ═══════════════════════════════════════════════════════════════

/// Removes leading runs of any byte in `left` and trailing runs of any
/// byte in `right` from the target content.
pub struct Trim {
    left: Vec<u8>,
    right: Vec<u8>,
    target: Target,
}

impl Trim {
    pub fn from_config(values: &ConfigValues) -> Result<Self, PluginError> {
        let cfg = TrimConfig::from_config(values)?;
        Ok(Self {
            left: cfg.left_separator.into_bytes(),
            right: cfg.right_separator.into_bytes(),
            target: Target::from_config_str(&cfg.target),
        })
    }
}

fn trim_bytes(data: &[u8], left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut start = 0;
    while start < data.len() && left.contains(&data[start]) {
        start += 1;
    }
    let mut end = data.len();
    while end > start && right.contains(&data[end - 1]) {
        end -= 1;
    }
    data[start..end].to_vec()
}

impl Formatter for Trim {
    fn apply(&self, message: &mut Message) -> Result<(), PluginError> {
        let content = get_applied_content(message, &self.target).as_bytes();
        let trimmed = trim_bytes(&content, &self.left, &self.right);
        set_applied_bytes(message, &self.target, trimmed);
        Ok(())
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_formatter(CLASS, |values, _bus| {
        Ok(Box::new(Trim::from_config(values)?) as Box<dyn Formatter>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_api::metadata::Metadata;
    use mux_api::value::Value;

    fn configured(left: &str, right: &str, target: &str) -> Trim {
        let mut values = ConfigValues::new();
        values.set("left_separator", mux_api::config::ParamValue::Str(left.to_string()));
        values.set("right_separator", mux_api::config::ParamValue::Str(right.to_string()));
        values.set("target", mux_api::config::ParamValue::Str(target.to_string()));
        Trim::from_config(&values).unwrap()
    }

    #[test]
    fn trims_payload() {
        let trim = configured("|", "|", "");
        let mut msg = Message::new(b"|foo bar foobar|".to_vec(), Metadata::new(), vec![]);
        trim.apply(&mut msg).unwrap();
        assert_eq!(msg.payload(), b"foo bar foobar");
    }

    #[test]
    fn trims_metadata_target_leaving_payload_untouched() {
        let trim = configured("|", "|", "foo");
        let mut metadata = Metadata::new();
        metadata.set("foo", Value::Bytes(b"|foo bar foobar|second foo bar|".to_vec()));
        let mut msg = Message::new(b"|foo bar foobar|".to_vec(), metadata, vec![]);

        trim.apply(&mut msg).unwrap();

        assert_eq!(msg.payload(), b"|foo bar foobar|");
        assert_eq!(
            msg.metadata().bytes("foo"),
            Some(b"foo bar foobar|second foo bar".to_vec())
        );
    }

    #[test]
    fn idempotent() {
        let trim = configured("|", "|", "");
        let mut msg = Message::new(b"|foo bar foobar|".to_vec(), Metadata::new(), vec![]);
        trim.apply(&mut msg).unwrap();
        let once = msg.payload().to_vec();
        trim.apply(&mut msg).unwrap();
        assert_eq!(msg.payload(), once.as_slice());
    }
}
