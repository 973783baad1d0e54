//! Settings-panel model.
//!
//! A variant describes its panel as a list of typed controls bound to setting
//! keys. The host renders it (or uses [`SettingsForm::to_markup`]) and routes
//! edits back through the session by key.

use crate::markup::escape_html;
use crate::settings::Settings;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Control {
    Text,
    Textarea,
    Url,
    Color,
    Toggle,
    DateTime,
    Number { min: f64, max: f64, step: f64 },
    Select { options: Vec<(String, String)> },
    /// Picker for an externally stored entity (e.g. a form)
    ResourcePicker { resource: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsField {
    /// Setting key the control is bound to
    pub key: String,
    pub label: String,
    pub control: Control,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsForm {
    pub fields: Vec<SettingsField>,
}

impl SettingsForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a control bound to `key`, reading its current value from `settings`
    pub fn field(mut self, settings: &Settings, key: &str, label: &str, control: Control) -> Self {
        self.fields.push(SettingsField {
            key: key.to_string(),
            label: label.to_string(),
            control,
            value: settings.get(key).cloned().unwrap_or(Value::Null),
        });
        self
    }

    pub fn binding(&self, key: &str) -> Option<&SettingsField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::from("<form class=\"sc-settings\">");
        for field in &self.fields {
            out.push_str("<label class=\"sc-setting\">");
            out.push_str(&format!("<span>{}</span>", escape_html(&field.label)));
            out.push_str(&render_control(field));
            out.push_str("</label>");
        }
        out.push_str("</form>");
        out
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_control(field: &SettingsField) -> String {
    let key = escape_html(&field.key);
    let value = escape_html(&value_text(&field.value));

    match &field.control {
        Control::Text => format!("<input type=\"text\" data-setting=\"{}\" value=\"{}\">", key, value),
        Control::Url => format!("<input type=\"url\" data-setting=\"{}\" value=\"{}\">", key, value),
        Control::Color => format!("<input type=\"color\" data-setting=\"{}\" value=\"{}\">", key, value),
        Control::DateTime => format!(
            "<input type=\"datetime-local\" data-setting=\"{}\" value=\"{}\">",
            key, value
        ),
        Control::Textarea => format!("<textarea data-setting=\"{}\">{}</textarea>", key, value),
        Control::Toggle => {
            let checked = if field.value.as_bool().unwrap_or(false) { " checked" } else { "" };
            format!("<input type=\"checkbox\" data-setting=\"{}\"{}>", key, checked)
        }
        Control::Number { min, max, step } => format!(
            "<input type=\"number\" data-setting=\"{}\" min=\"{}\" max=\"{}\" step=\"{}\" value=\"{}\">",
            key, min, max, step, value
        ),
        Control::Select { options } => {
            let mut out = format!("<select data-setting=\"{}\">", key);
            for (option_value, option_label) in options {
                let selected = if value_text(&field.value) == *option_value { " selected" } else { "" };
                out.push_str(&format!(
                    "<option value=\"{}\"{}>{}</option>",
                    escape_html(option_value),
                    selected,
                    escape_html(option_label)
                ));
            }
            out.push_str("</select>");
            out
        }
        Control::ResourcePicker { resource } => format!(
            "<select data-setting=\"{}\" data-resource=\"{}\" data-selected=\"{}\"></select>",
            key,
            escape_html(resource),
            value
        ),
    }
}

/// Shorthand for building select options
pub(crate) fn options(pairs: &[(&str, &str)]) -> Control {
    Control::Select {
        options: pairs
            .iter()
            .map(|(v, l)| (v.to_string(), l.to_string()))
            .collect(),
    }
}
