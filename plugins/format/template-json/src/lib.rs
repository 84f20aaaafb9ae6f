use mux_api::config::ConfigValues;
use mux_api::error::PluginError;
use mux_api::formatter::{get_applied_content, set_applied_bytes, Formatter, Target};
use mux_api::message::Message;
use mux_api::ConfigParams;
use mux_engine::registry::PluginRegistry;

pub const CLASS: &str = "format.TemplateJSON";

// ═══════════════════════════════════════════════════════════════
//  TemplateJSONConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, ConfigParams)]
pub struct TemplateJSONConfig {
    #[param(description = "Template referencing JSON keys as .name", required)]
    pub template: String,
    #[param(description = "Payload if empty, else a metadata key")]
    pub apply_to: String,
}

// ═══════════════════════════════════════════════════════════════
//  TemplateJSON
// ═══════════════════════════════════════════════════════════════

/// Parses the target content as a JSON object and renders a template
/// against it, writing the rendered text back to the target.
///
/// `template` uses the Go `text/template` root-field convention
/// (`{{ .foo }}`); this is normalized to plain variable references before
/// handing the template to the rendering engine.
pub struct TemplateJSON {
    template: String,
    target: Target,
}

impl TemplateJSON {
    pub fn from_config(values: &ConfigValues) -> Result<Self, PluginError> {
        let cfg = TemplateJSONConfig::from_config(values)?;
        Ok(Self {
            template: normalize_go_template(&cfg.template),
            target: Target::from_config_str(&cfg.apply_to),
        })
    }
}

/// Strips the leading `.` from `{{ .field }}`-style references, leaving
/// plain `{{ field }}` for the rendering engine.
fn normalize_go_template(template: &str) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' && chars.get(i + 1) == Some(&'{') {
            out.push_str("{{");
            i += 2;
            while i < chars.len() && chars[i].is_whitespace() {
                out.push(chars[i]);
                i += 1;
            }
            if chars.get(i) == Some(&'.') {
                i += 1;
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

impl Formatter for TemplateJSON {
    fn apply(&self, message: &mut Message) -> Result<(), PluginError> {
        let raw = get_applied_content(message, &self.target).as_bytes();
        let json: serde_json::Value = serde_json::from_slice(&raw)
            .map_err(|e| PluginError::format(format!("TemplateJSON: invalid JSON: {e}")))?;
        if !json.is_object() {
            return Err(PluginError::format("TemplateJSON: target content is not a JSON object"));
        }

        let mut env = minijinja::Environment::new();
        env.add_template("message", &self.template)
            .map_err(|e| PluginError::format(format!("TemplateJSON: invalid template: {e}")))?;
        let rendered = env
            .get_template("message")
            .expect("template was just added")
            .render(&json)
            .map_err(|e| PluginError::format(format!("TemplateJSON: render failed: {e}")))?;

        set_applied_bytes(message, &self.target, rendered.into_bytes());
        Ok(())
    }
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register_formatter(CLASS, |values, _bus| {
        Ok(Box::new(TemplateJSON::from_config(values)?) as Box<dyn Formatter>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_api::metadata::Metadata;
    use mux_api::value::Value;

    fn configured(template: &str, apply_to: &str) -> TemplateJSON {
        let mut values = ConfigValues::new();
        values.set("template", mux_api::config::ParamValue::Str(template.to_string()));
        values.set("apply_to", mux_api::config::ParamValue::Str(apply_to.to_string()));
        TemplateJSON::from_config(&values).unwrap()
    }

    #[test]
    fn renders_payload_against_its_own_json() {
        let formatter = configured("{{ .foo }} {{ .test }}", "");
        let mut msg = Message::new(br#"{"foo":"bar","test":"valid"}"#.to_vec(), Metadata::new(), vec![]);
        formatter.apply(&mut msg).unwrap();
        assert_eq!(msg.payload(), b"bar valid");
    }

    #[test]
    fn renders_metadata_target_leaving_payload_untouched() {
        let formatter = configured("{{ .foo }} {{ .test }}", "foo");
        let mut metadata = Metadata::new();
        metadata.set("foo", Value::Bytes(br#"{"foo":"bar","test":"valid"}"#.to_vec()));
        let mut msg = Message::new(b"payload".to_vec(), metadata, vec![]);

        formatter.apply(&mut msg).unwrap();

        assert_eq!(msg.payload(), b"payload");
        assert_eq!(msg.metadata().bytes("foo"), Some(b"bar valid".to_vec()));
    }

    #[test]
    fn invalid_json_is_a_format_error_and_leaves_message_unmodified() {
        let formatter = configured("{{ .foo }}", "");
        let mut msg = Message::new(b"not json".to_vec(), Metadata::new(), vec![]);
        let result = formatter.apply(&mut msg);
        assert!(result.is_err());
        assert_eq!(msg.payload(), b"not json");
    }
}
