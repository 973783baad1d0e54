use super::{editable, validate_align, ALIGN_OPTIONS};
use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{options, Control, SettingsForm};
use crate::markup::{close_root, open_root, InlineStyle};
use crate::settings::{expect_range, expect_str, to_settings, typed, Alignment, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextSettings {
    pub font_size: u32,
    pub color: String,
    pub align: Alignment,
    pub line_height: f64,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            font_size: 16,
            color: "#333333".to_string(),
            align: Alignment::Left,
            line_height: 1.5,
        }
    }
}

#[derive(Debug)]
pub struct Text;

impl BlockVariant for Text {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn display_name(&self) -> &'static str {
        "Text"
    }

    fn icon(&self) -> &'static str {
        "text"
    }

    fn category(&self) -> Category {
        Category::Basic
    }

    fn default_settings(&self) -> Settings {
        to_settings(&TextSettings::default())
    }

    fn default_content(&self) -> Option<String> {
        Some("<p>Add your text here</p>".to_string())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let style = self.inline_style(&block.settings);
        format!(
            "{}{}{}",
            open_root(block, &InlineStyle::new()),
            editable("div", "", block.content.as_deref().unwrap_or(""), "Type something...", &style),
            close_root()
        )
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "fontSize", "Font size", Control::Number { min: 8.0, max: 200.0, step: 1.0 })
            .field(settings, "color", "Text color", Control::Color)
            .field(settings, "align", "Alignment", options(ALIGN_OPTIONS))
            .field(settings, "lineHeight", "Line height", Control::Number { min: 0.5, max: 4.0, step: 0.1 })
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "fontSize" => expect_range(key, value, 8.0, 200.0).map(|_| ()),
            "lineHeight" => expect_range(key, value, 0.5, 4.0).map(|_| ()),
            "color" => expect_str(key, value).map(|_| ()),
            "align" => validate_align(key, value),
            _ => Ok(()),
        }
    }

    fn is_text_bearing(&self) -> bool {
        true
    }

    fn inline_style(&self, settings: &Settings) -> InlineStyle {
        let s: TextSettings = typed(settings);
        InlineStyle::new()
            .push("font-size", format!("{}px", s.font_size))
            .push("color", s.color)
            .push("text-align", s.align.as_css())
            .push("line-height", s.line_height.to_string())
    }
}
