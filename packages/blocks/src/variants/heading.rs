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
pub struct HeadingSettings {
    pub level: u8,
    pub font_size: u32,
    pub color: String,
    pub align: Alignment,
}

impl Default for HeadingSettings {
    fn default() -> Self {
        Self {
            level: 2,
            font_size: 28,
            color: "#111111".to_string(),
            align: Alignment::Center,
        }
    }
}

#[derive(Debug)]
pub struct Heading;

impl BlockVariant for Heading {
    fn kind(&self) -> &'static str {
        "heading"
    }

    fn display_name(&self) -> &'static str {
        "Heading"
    }

    fn icon(&self) -> &'static str {
        "heading"
    }

    fn category(&self) -> Category {
        Category::Basic
    }

    fn default_settings(&self) -> Settings {
        to_settings(&HeadingSettings::default())
    }

    fn default_content(&self) -> Option<String> {
        Some("Your headline".to_string())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: HeadingSettings = typed(&block.settings);
        let tag = format!("h{}", s.level.clamp(1, 6));
        format!(
            "{}{}{}",
            open_root(block, &InlineStyle::new()),
            editable(
                &tag,
                "sc-heading",
                block.content.as_deref().unwrap_or(""),
                "Heading",
                &self.inline_style(&block.settings)
            ),
            close_root()
        )
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(
                settings,
                "level",
                "Level",
                options(&[("1", "H1"), ("2", "H2"), ("3", "H3"), ("4", "H4"), ("5", "H5"), ("6", "H6")]),
            )
            .field(settings, "fontSize", "Font size", Control::Number { min: 8.0, max: 200.0, step: 1.0 })
            .field(settings, "color", "Text color", Control::Color)
            .field(settings, "align", "Alignment", options(ALIGN_OPTIONS))
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "level" => expect_range(key, value, 1.0, 6.0).map(|_| ()),
            "fontSize" => expect_range(key, value, 8.0, 200.0).map(|_| ()),
            "color" => expect_str(key, value).map(|_| ()),
            "align" => validate_align(key, value),
            _ => Ok(()),
        }
    }

    fn is_text_bearing(&self) -> bool {
        true
    }

    fn inline_style(&self, settings: &Settings) -> InlineStyle {
        let s: HeadingSettings = typed(settings);
        InlineStyle::new()
            .push("font-size", format!("{}px", s.font_size))
            .push("color", s.color)
            .push("text-align", s.align.as_css())
    }
}
