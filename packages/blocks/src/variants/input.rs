use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{options, Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_str, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, FieldSpec, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Tel,
    Number,
}

impl InputType {
    fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Email => "email",
            InputType::Tel => "tel",
            InputType::Number => "number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputSettings {
    pub name: String,
    pub label: String,
    pub placeholder: String,
    pub input_type: InputType,
    pub required: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            name: "email".to_string(),
            label: "Email".to_string(),
            placeholder: "you@example.com".to_string(),
            input_type: InputType::Email,
            required: false,
        }
    }
}

/// Single input field placed directly in a step
#[derive(Debug)]
pub struct Input;

impl BlockVariant for Input {
    fn kind(&self) -> &'static str {
        "input"
    }

    fn display_name(&self) -> &'static str {
        "Input field"
    }

    fn icon(&self) -> &'static str {
        "text-cursor-input"
    }

    fn category(&self) -> Category {
        Category::Form
    }

    fn default_settings(&self) -> Settings {
        to_settings(&InputSettings::default())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: InputSettings = typed(&block.settings);
        let field = format!(
            "<label class=\"sc-field\"><span>{}{}</span><input type=\"{}\" name=\"{}\" placeholder=\"{}\" data-field-key=\"{}\"{}></label>",
            escape_html(&s.label),
            if s.required { " *" } else { "" },
            s.input_type.as_str(),
            escape_html(&s.name),
            escape_html(&s.placeholder),
            escape_html(block.id.as_str()),
            if s.required { " required" } else { "" }
        );
        format!("{}{}{}", open_root(block, &InlineStyle::new()), field, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "label", "Label", Control::Text)
            .field(settings, "name", "Field name", Control::Text)
            .field(settings, "placeholder", "Placeholder", Control::Text)
            .field(
                settings,
                "inputType",
                "Type",
                options(&[("text", "Text"), ("email", "Email"), ("tel", "Phone"), ("number", "Number")]),
            )
            .field(settings, "required", "Required", Control::Toggle)
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "name" => {
                let name = expect_str(key, value)?;
                if name.trim().is_empty() {
                    Err(BlockError::invalid(key, "field name cannot be empty"))
                } else {
                    Ok(())
                }
            }
            "label" | "placeholder" => expect_str(key, value).map(|_| ()),
            "inputType" => serde_json::from_value::<InputType>(value.clone())
                .map(|_| ())
                .map_err(|_| BlockError::invalid(key, "unknown input type")),
            "required" => super::validate_bool(key, value),
            _ => Ok(()),
        }
    }

    fn fields(&self, block: &Block, _ctx: &RenderContext<'_>) -> Vec<FieldSpec> {
        let s: InputSettings = typed(&block.settings);
        vec![FieldSpec {
            key: block.id.to_string(),
            label: s.label,
            required: s.required,
        }]
    }
}
