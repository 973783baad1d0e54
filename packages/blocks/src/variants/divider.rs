use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{options, Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_range, expect_str, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    fn as_css(&self) -> &'static str {
        match self {
            LineStyle::Solid => "solid",
            LineStyle::Dashed => "dashed",
            LineStyle::Dotted => "dotted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DividerSettings {
    pub color: String,
    pub thickness: u32,
    pub style: LineStyle,
}

impl Default for DividerSettings {
    fn default() -> Self {
        Self {
            color: "#e5e7eb".to_string(),
            thickness: 1,
            style: LineStyle::Solid,
        }
    }
}

#[derive(Debug)]
pub struct Divider;

impl BlockVariant for Divider {
    fn kind(&self) -> &'static str {
        "divider"
    }

    fn display_name(&self) -> &'static str {
        "Divider"
    }

    fn icon(&self) -> &'static str {
        "minus"
    }

    fn category(&self) -> Category {
        Category::Layout
    }

    fn default_settings(&self) -> Settings {
        to_settings(&DividerSettings::default())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: DividerSettings = typed(&block.settings);
        let rule = format!(
            "<hr style=\"border: 0; border-top: {}px {} {};\">",
            s.thickness,
            s.style.as_css(),
            escape_html(&s.color)
        );
        format!("{}{}{}", open_root(block, &InlineStyle::new()), rule, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "color", "Color", Control::Color)
            .field(settings, "thickness", "Thickness", Control::Number { min: 1.0, max: 20.0, step: 1.0 })
            .field(
                settings,
                "style",
                "Style",
                options(&[("solid", "Solid"), ("dashed", "Dashed"), ("dotted", "Dotted")]),
            )
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "color" => expect_str(key, value).map(|_| ()),
            "thickness" => expect_range(key, value, 1.0, 20.0).map(|_| ()),
            "style" => serde_json::from_value::<LineStyle>(value.clone())
                .map(|_| ())
                .map_err(|_| BlockError::invalid(key, "expected solid, dashed or dotted")),
            _ => Ok(()),
        }
    }
}
