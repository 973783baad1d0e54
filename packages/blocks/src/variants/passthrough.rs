use crate::block::Block;
use crate::form::SettingsForm;
use crate::markup::{close_root, open_root, InlineStyle};
use crate::settings::Settings;
use crate::variant::{BlockVariant, Category, RenderContext};

/// Stand-in for block types this editor does not know.
///
/// Keeps type, content, attributes and settings exactly as loaded.
#[derive(Debug, Default)]
pub struct PassThrough;

impl BlockVariant for PassThrough {
    fn kind(&self) -> &'static str {
        "passthrough"
    }

    fn display_name(&self) -> &'static str {
        "Unsupported block"
    }

    fn icon(&self) -> &'static str {
        "circle-help"
    }

    fn category(&self) -> Category {
        Category::Advanced
    }

    fn default_settings(&self) -> Settings {
        Settings::new()
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        format!(
            "{}<div class=\"sc-passthrough\">{}</div>{}",
            open_root(block, &InlineStyle::new()),
            block.content.as_deref().unwrap_or(""),
            close_root()
        )
    }

    fn settings_form(&self, _settings: &Settings) -> SettingsForm {
        SettingsForm::new()
    }

    fn deserialize(&self, raw: Block) -> Block {
        raw
    }
}
