use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{Control, SettingsForm};
use crate::markup::{close_root, open_root, InlineStyle};
use crate::settings::{expect_range, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacerSettings {
    pub height: u32,
}

impl Default for SpacerSettings {
    fn default() -> Self {
        Self { height: 24 }
    }
}

#[derive(Debug)]
pub struct Spacer;

impl BlockVariant for Spacer {
    fn kind(&self) -> &'static str {
        "spacer"
    }

    fn display_name(&self) -> &'static str {
        "Spacer"
    }

    fn icon(&self) -> &'static str {
        "move-vertical"
    }

    fn category(&self) -> Category {
        Category::Layout
    }

    fn default_settings(&self) -> Settings {
        to_settings(&SpacerSettings::default())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: SpacerSettings = typed(&block.settings);
        let style = InlineStyle::new().push("height", format!("{}px", s.height));
        format!("{}{}", open_root(block, &style), close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new().field(settings, "height", "Height", Control::Number { min: 0.0, max: 400.0, step: 1.0 })
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "height" => expect_range(key, value, 0.0, 400.0).map(|_| ()),
            _ => Ok(()),
        }
    }
}
