use super::{editable, validate_action, validate_align, Action, ALIGN_OPTIONS};
use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{options, Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_range, expect_str, to_settings, typed, Alignment, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonSettings {
    pub action: Action,
    pub url: String,
    pub background_color: String,
    pub color: String,
    pub align: Alignment,
    pub border_radius: u32,
    pub full_width: bool,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self {
            action: Action::NextStep,
            url: String::new(),
            background_color: "#2563eb".to_string(),
            color: "#ffffff".to_string(),
            align: Alignment::Center,
            border_radius: 4,
            full_width: false,
        }
    }
}

#[derive(Debug)]
pub struct Button;

impl BlockVariant for Button {
    fn kind(&self) -> &'static str {
        "button"
    }

    fn display_name(&self) -> &'static str {
        "Button"
    }

    fn icon(&self) -> &'static str {
        "square-mouse-pointer"
    }

    fn category(&self) -> Category {
        Category::Basic
    }

    fn default_settings(&self) -> Settings {
        to_settings(&ButtonSettings::default())
    }

    fn default_content(&self) -> Option<String> {
        Some("Click me".to_string())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: ButtonSettings = typed(&block.settings);
        let wrapper = InlineStyle::new().push("text-align", s.align.as_css());
        let label = editable(
            "span",
            "sc-button-label",
            block.content.as_deref().unwrap_or(""),
            "Button text",
            &InlineStyle::new(),
        );

        let mut button = format!(
            "<button type=\"button\" class=\"sc-button\" data-action=\"{}\"",
            s.action.as_str()
        );
        if s.action == Action::Url && !s.url.is_empty() {
            button.push_str(&format!(" data-url=\"{}\"", escape_html(&s.url)));
        }
        button.push_str(&format!(
            " style=\"{}\">{}</button>",
            escape_html(&self.inline_style(&block.settings).to_css()),
            label
        ));

        format!("{}{}{}", open_root(block, &wrapper), button, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "action", "On click", options(Action::OPTIONS))
            .field(settings, "url", "URL", Control::Url)
            .field(settings, "backgroundColor", "Background", Control::Color)
            .field(settings, "color", "Text color", Control::Color)
            .field(settings, "align", "Alignment", options(ALIGN_OPTIONS))
            .field(settings, "borderRadius", "Corner radius", Control::Number { min: 0.0, max: 100.0, step: 1.0 })
            .field(settings, "fullWidth", "Full width", Control::Toggle)
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "action" => validate_action(key, value),
            "url" | "backgroundColor" | "color" => expect_str(key, value).map(|_| ()),
            "align" => validate_align(key, value),
            "borderRadius" => expect_range(key, value, 0.0, 100.0).map(|_| ()),
            "fullWidth" => super::validate_bool(key, value),
            _ => Ok(()),
        }
    }

    fn is_text_bearing(&self) -> bool {
        true
    }

    fn inline_style(&self, settings: &Settings) -> InlineStyle {
        let s: ButtonSettings = typed(settings);
        let mut style = InlineStyle::new()
            .push("background-color", s.background_color)
            .push("color", s.color)
            .push("border-radius", format!("{}px", s.border_radius));
        if s.full_width {
            style.set("width", "100%");
        }
        style
    }
}
