use mux_api::config::{ConfigValues, ParamValue};
use serde::Deserialize;

use crate::error::EngineError;

/// Root configuration — parsed from TOML. Each section is a list of
/// named instance blocks naming the plugin class to construct.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MuxConfig {
    #[serde(default)]
    pub consumers: Vec<InstanceConfig>,
    #[serde(default)]
    pub producers: Vec<InstanceConfig>,
    #[serde(default)]
    pub formatters: Vec<InstanceConfig>,
}

fn default_enable() -> bool {
    true
}

/// One configured plugin instance.
///
/// `streams` is meaningful for producers only (subscription list; `"*"`
/// selects the wildcard stream). `modulators` is an ordered list
/// of formatter instance names (by `name`, not `class`) applied to every
/// message a consumer emits or a producer is about to receive.
/// `config` is a flat table of plugin-specific fields, bound by the
/// target plugin's own `ConfigParams::from_config`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    pub class: String,
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub streams: Vec<String>,
    #[serde(default)]
    pub modulators: Vec<String>,
    #[serde(default)]
    pub config: toml::value::Table,
}

impl MuxConfig {
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Flatten a TOML table into [`ConfigValues`] for a plugin's
/// `ConfigParams::from_config` binder. Only scalar TOML types are
/// supported — the generated derive methods bind scalar fields by name
/// and type; plugins needing list-shaped fields (e.g. `ToArray`'s `keys`)
/// accept a delimited string and split it themselves.
pub fn config_values_from_toml(table: &toml::value::Table) -> Result<ConfigValues, EngineError> {
    let mut values = ConfigValues::new();
    for (key, value) in table {
        let param = match value {
            toml::Value::Boolean(b) => ParamValue::Bool(*b),
            toml::Value::Integer(i) => ParamValue::I64(*i),
            toml::Value::Float(f) => ParamValue::F64(*f),
            toml::Value::String(s) => ParamValue::Str(s.clone()),
            other => {
                return Err(EngineError::Config(format!(
                    "config key '{key}': unsupported value type {other:?}, expected a scalar"
                )))
            }
        };
        values.set(key.clone(), param);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg = MuxConfig::parse(
            r#"
            [[consumers]]
            name = "in"
            class = "consumer.Stdin"

            [[producers]]
            name = "out"
            class = "producer.Console"
            streams = ["*"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.consumers.len(), 1);
        assert_eq!(cfg.producers[0].streams, vec!["*".to_string()]);
    }

    #[test]
    fn flattens_scalar_config_table() {
        let cfg = MuxConfig::parse(
            r#"
            [[formatters]]
            name = "t"
            class = "format.Trim"
            [formatters.config]
            left_separator = "|"
            right_separator = "|"
            "#,
        )
        .unwrap();
        let values = config_values_from_toml(&cfg.formatters[0].config).unwrap();
        assert_eq!(values.get_str("left_separator"), Some("|"));
    }

    #[test]
    fn rejects_nested_table_value() {
        let cfg = MuxConfig::parse(
            r#"
            [[formatters]]
            name = "t"
            class = "format.Trim"
            [formatters.config.nested]
            a = 1
            "#,
        )
        .unwrap();
        assert!(config_values_from_toml(&cfg.formatters[0].config).is_err());
    }
}
