use crate::block::Block;
use crate::errors::BlockError;
use crate::form::SettingsForm;
use crate::markup::InlineStyle;
use crate::resource::ResourceState;
use crate::settings::{merge_defaults, Settings};
use serde::Serialize;
use serde_json::Value;

/// Palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Basic,
    Media,
    Layout,
    Form,
    Advanced,
}

impl Category {
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Basic => "Basic",
            Category::Media => "Media",
            Category::Layout => "Layout",
            Category::Form => "Form",
            Category::Advanced => "Advanced",
        }
    }
}

/// Extra state a renderer may depend on besides the block itself
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    /// Resolution state of the block's external reference, if it has one
    pub resource: Option<&'a ResourceState>,
}

impl<'a> RenderContext<'a> {
    pub fn with_resource(resource: Option<&'a ResourceState>) -> Self {
        Self { resource }
    }
}

/// An input rendered on the editable surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    pub required: bool,
}

/// One kind of block.
///
/// Implementations are stateless: everything a variant renders comes from the
/// block it is handed and the render context.
pub trait BlockVariant: Send + Sync + std::fmt::Debug {
    /// Type discriminator stored in `Block::kind`
    fn kind(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn icon(&self) -> &'static str;

    fn category(&self) -> Category;

    fn default_settings(&self) -> Settings;

    fn default_content(&self) -> Option<String> {
        None
    }

    /// Editable approximation of the block
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String;

    fn settings_form(&self, settings: &Settings) -> SettingsForm;

    /// Check a single setting before it is written
    fn validate_setting(&self, _key: &str, _value: &Value) -> Result<(), BlockError> {
        Ok(())
    }

    /// Merge saved data into this variant's defaults
    fn deserialize(&self, raw: Block) -> Block {
        Block {
            settings: merge_defaults(self.default_settings(), &raw.settings),
            content: raw.content.or_else(|| self.default_content()),
            ..raw
        }
    }

    /// Identifier of the external entity this block embeds, if any
    fn external_reference(&self, _settings: &Settings) -> Option<String> {
        None
    }

    /// Whether the settings panel should open as soon as the block is dropped
    fn needs_configuration(&self, _block: &Block) -> bool {
        false
    }

    /// Whether the block owns a rich-text region
    fn is_text_bearing(&self) -> bool {
        false
    }

    /// Styling applied to the editable region when it gains focus
    fn inline_style(&self, _settings: &Settings) -> InlineStyle {
        InlineStyle::new()
    }

    /// Inputs this block puts on the editable surface
    fn fields(&self, _block: &Block, _ctx: &RenderContext<'_>) -> Vec<FieldSpec> {
        Vec::new()
    }
}
