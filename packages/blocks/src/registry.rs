//! # Block Registry
//!
//! Maps type discriminators to variants. Every place that needs to treat
//! blocks polymorphically (create, load, render, settings panel) goes through
//! here; unknown types resolve to the pass-through variant so they are
//! carried through a load/save cycle untouched.

use crate::block::Block;
use crate::errors::BlockError;
use crate::form::SettingsForm;
use crate::legacy;
use crate::settings::{merge_defaults, Settings};
use crate::variant::{BlockVariant, Category, FieldSpec, RenderContext};
use crate::variants::{self, PassThrough};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Palette entry for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub display_name: String,
    pub icon: String,
}

#[derive(Debug)]
pub struct BlockRegistry {
    variants: BTreeMap<String, Box<dyn BlockVariant>>,
    fallback: PassThrough,
}

impl BlockRegistry {
    /// Empty registry (every type resolves to pass-through)
    pub fn new() -> Self {
        Self {
            variants: BTreeMap::new(),
            fallback: PassThrough,
        }
    }

    /// Registry with every built-in variant
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for variant in variants::builtins() {
            registry.register_boxed(variant);
        }
        registry
    }

    /// Register a variant, replacing any earlier one with the same type
    pub fn register(&mut self, variant: impl BlockVariant + 'static) {
        self.register_boxed(Box::new(variant));
    }

    fn register_boxed(&mut self, variant: Box<dyn BlockVariant>) {
        debug!(kind = variant.kind(), "Registering block variant");
        self.variants.insert(variant.kind().to_string(), variant);
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.variants.contains_key(kind)
    }

    /// Look up a registered variant
    pub fn get(&self, kind: &str) -> Result<&dyn BlockVariant, BlockError> {
        self.variants
            .get(kind)
            .map(|v| v.as_ref())
            .ok_or_else(|| BlockError::UnknownType(kind.to_string()))
    }

    /// Variant interpreting `block`, or the pass-through variant
    pub fn variant_for(&self, block: &Block) -> &dyn BlockVariant {
        self.get(&block.kind).unwrap_or(&self.fallback)
    }

    /// Create a fresh block of a registered type.
    ///
    /// `initial` is merged over the variant defaults; each provided key is
    /// validated by the variant.
    pub fn create(&self, kind: &str, initial: Option<Settings>) -> Result<Block, BlockError> {
        let variant = self.get(kind)?;

        let initial = initial.unwrap_or_default();
        for (key, value) in &initial {
            variant.validate_setting(key, value)?;
        }

        let mut block = Block::new(kind);
        block.settings = merge_defaults(variant.default_settings(), &initial);
        block.content = variant.default_content();
        Ok(block)
    }

    /// Like [`create`](Self::create) but never fails: unknown types become
    /// pass-through blocks that keep their type string.
    pub fn create_or_passthrough(&self, kind: &str, initial: Option<Settings>) -> Block {
        match self.create(kind, initial.clone()) {
            Ok(block) => block,
            Err(e) => {
                debug!(kind, error = %e, "Falling back to pass-through block");
                Block::new(kind).with_settings(initial.unwrap_or_default())
            }
        }
    }

    /// Turn a block read from storage into its in-editor form.
    ///
    /// Known types are merged into their defaults (legacy inline styles are
    /// imported first); unknown types are returned verbatim.
    pub fn hydrate(&self, raw: Block) -> Block {
        let Ok(variant) = self.get(&raw.kind) else {
            debug!(kind = %raw.kind, block_id = %raw.id, "Preserving unknown block type");
            return raw;
        };

        let raw = if raw.settings.is_empty() && raw.attribute_str("style").is_some() {
            legacy::import(raw, &variant.default_settings())
        } else {
            raw
        };

        variant.deserialize(raw)
    }

    pub fn validate_setting(&self, block: &Block, key: &str, value: &serde_json::Value) -> Result<(), BlockError> {
        self.variant_for(block).validate_setting(key, value)
    }

    pub fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        self.variant_for(block).render(block, ctx)
    }

    pub fn settings_form(&self, block: &Block) -> SettingsForm {
        self.variant_for(block).settings_form(&block.settings)
    }

    pub fn external_reference(&self, block: &Block) -> Option<String> {
        self.variant_for(block).external_reference(&block.settings)
    }

    pub fn fields(&self, block: &Block, ctx: &RenderContext<'_>) -> Vec<FieldSpec> {
        self.variant_for(block).fields(block, ctx)
    }

    /// Palette items grouped by category
    pub fn categories(&self) -> BTreeMap<Category, Vec<PaletteItem>> {
        let mut groups: BTreeMap<Category, Vec<PaletteItem>> = BTreeMap::new();
        for variant in self.variants.values() {
            groups.entry(variant.category()).or_default().push(PaletteItem {
                kind: variant.kind().to_string(),
                display_name: variant.display_name().to_string(),
                icon: variant.icon().to_string(),
            });
        }
        groups
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
