//! # Editing Surface
//!
//! The live, in-editor state of the current step: its block order and
//! content, the input fields rendered for it (with whatever the author typed
//! into them), the selection and the drag placeholder.
//!
//! The surface is flushed into the document's step before any step switch
//! and after every discrete mutation; the document is never edited behind
//! the surface's back.

use crate::document::{Step, StepId};
use std::collections::HashMap;
use stepcraft_blocks::{Block, BlockId, BlockRegistry, RenderContext, ResourceState};

/// An input currently rendered on the surface
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField {
    pub block_id: BlockId,
    pub key: String,
    pub label: String,
    pub required: bool,
    pub value: String,
    pub invalid: bool,
}

impl RenderedField {
    pub fn is_filled(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// Gap shown where a block being reordered will land
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placeholder {
    /// Position among the blocks that are not being dragged
    pub index: usize,
    pub height: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Surface {
    pub step_id: StepId,
    pub blocks: Vec<Block>,
    pub fields: Vec<RenderedField>,
    pub selected: Option<BlockId>,
    /// Block currently lifted by a reorder drag
    pub dragging: Option<BlockId>,
    pub placeholder: Option<Placeholder>,
}

impl Surface {
    pub fn load(step: &Step) -> Self {
        Self {
            step_id: step.id,
            blocks: step.blocks.clone(),
            ..Default::default()
        }
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    pub fn position_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// Insert at `index`, clamped to the end
    pub fn insert(&mut self, index: usize, block: Block) -> usize {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        index
    }

    pub fn remove(&mut self, id: &BlockId) -> Option<(usize, Block)> {
        let index = self.position_of(id)?;
        let block = self.blocks.remove(index);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.fields.retain(|f| &f.block_id != id);
        Some((index, block))
    }

    /// Blocks that are not lifted by a reorder drag, in order
    pub fn resting_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(move |b| self.dragging.as_ref() != Some(&b.id))
    }

    /// Rebuild the field list from the blocks, keeping typed values and
    /// invalid flags for fields that are still present.
    pub fn refresh_fields<'r, F>(&mut self, registry: &BlockRegistry, resource_of: F)
    where
        F: Fn(&BlockId) -> Option<&'r ResourceState>,
    {
        let mut previous: HashMap<String, RenderedField> =
            self.fields.drain(..).map(|f| (f.key.clone(), f)).collect();

        for block in &self.blocks {
            let ctx = RenderContext::with_resource(resource_of(&block.id));
            for spec in registry.fields(block, &ctx) {
                let (value, invalid) = previous
                    .remove(&spec.key)
                    .map(|f| (f.value, f.invalid))
                    .unwrap_or_default();
                self.fields.push(RenderedField {
                    block_id: block.id.clone(),
                    key: spec.key,
                    label: spec.label,
                    required: spec.required,
                    value,
                    invalid,
                });
            }
        }
    }

    pub fn field(&self, key: &str) -> Option<&RenderedField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Record what the author typed into a field; clears its invalid flag
    /// once it is filled. Returns false for unknown keys.
    pub fn set_field_value(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|f| f.key == key) {
            Some(field) => {
                field.value = value.into();
                if field.is_filled() {
                    field.invalid = false;
                }
                true
            }
            None => false,
        }
    }

    /// Keys of required fields that are empty
    pub fn missing_required(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required && !f.is_filled())
            .map(|f| f.key.clone())
            .collect()
    }

    pub fn flag_invalid(&mut self, keys: &[String]) {
        for field in &mut self.fields {
            field.invalid = keys.contains(&field.key);
        }
    }

    pub fn invalid_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.invalid)
            .map(|f| f.key.as_str())
            .collect()
    }
}
