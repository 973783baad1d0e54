//! # Inline Editing
//!
//! Keeps contenteditable regions and their blocks' `content` in step.
//!
//! ```text
//!   focus ──► style from block settings applied to the region
//!   input ──► empty flag updated, markup debounced ──► due() ──► ContentCommit
//!   blur  ──► pending markup flushed immediately ───────────────► ContentCommit
//! ```
//!
//! Commits are handed back to the caller, which writes them into the block
//! and records one history entry per commit.

use crate::config::EditorConfig;
use crate::debounce::Debouncer;
use crate::formatting::Toolbar;
use crate::sanitize::{sanitize_paste, PasteContent};
use std::collections::BTreeMap;
use std::time::Duration;
use stepcraft_blocks::markup::{plain_text, InlineStyle};
use stepcraft_blocks::{Block, BlockId, BlockRegistry};
use tracing::debug;

/// Markup to write into a block's `content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCommit {
    pub block_id: BlockId,
    pub markup: String,
}

#[derive(Debug)]
struct Region {
    markup: String,
    empty: bool,
    style: InlineStyle,
    pending: Debouncer<String>,
}

/// True when the markup shows no text (tags, whitespace and `&nbsp;` only)
pub fn is_visually_empty(markup: &str) -> bool {
    plain_text(markup).trim().is_empty()
}

#[derive(Debug)]
pub struct InlineEditSync {
    regions: BTreeMap<BlockId, Region>,
    focused: Option<BlockId>,
    delay: Duration,
    toolbar: Toolbar,
}

impl InlineEditSync {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            regions: BTreeMap::new(),
            focused: None,
            delay: config.inline_debounce(),
            toolbar: Toolbar::new(config),
        }
    }

    pub fn focused(&self) -> Option<&BlockId> {
        self.focused.as_ref()
    }

    /// Focus the region of `block`. Returns the style the host must apply to
    /// the region so it matches the block's current settings.
    pub fn focus(&mut self, block: &Block, registry: &BlockRegistry) -> InlineStyle {
        let style = registry.variant_for(block).inline_style(&block.settings);
        let markup = block.content.clone().unwrap_or_default();
        let delay = self.delay;

        let region = self.regions.entry(block.id.clone()).or_insert_with(|| Region {
            empty: is_visually_empty(&markup),
            markup,
            style: InlineStyle::new(),
            pending: Debouncer::new(delay),
        });
        region.style = style.clone();

        debug!(block_id = %block.id, "Focused editable region");
        self.focused = Some(block.id.clone());
        style
    }

    /// Record new markup typed into a region. Returns whether the region is
    /// now visually empty (the placeholder should show).
    pub fn input(&mut self, block_id: &BlockId, markup: &str, now: Duration) -> bool {
        let delay = self.delay;
        let region = self.regions.entry(block_id.clone()).or_insert_with(|| Region {
            markup: String::new(),
            empty: true,
            style: InlineStyle::new(),
            pending: Debouncer::new(delay),
        });

        region.markup = markup.to_string();
        region.empty = is_visually_empty(markup);
        region.pending.call(markup.to_string(), now);
        region.empty
    }

    /// Commits whose quiet period has elapsed
    pub fn due(&mut self, now: Duration) -> Vec<ContentCommit> {
        self.regions
            .iter_mut()
            .filter_map(|(id, region)| {
                region.pending.poll(now).map(|markup| ContentCommit {
                    block_id: id.clone(),
                    markup,
                })
            })
            .collect()
    }

    /// Leave a region, flushing whatever is still pending
    pub fn blur(&mut self, block_id: &BlockId) -> Option<ContentCommit> {
        if self.focused.as_ref() == Some(block_id) {
            self.focused = None;
            self.toolbar.hide();
        }
        let markup = self.regions.get_mut(block_id)?.pending.flush()?;
        debug!(block_id = %block_id, "Flushed region on blur");
        Some(ContentCommit {
            block_id: block_id.clone(),
            markup,
        })
    }

    /// Flush every pending region (before a step switch, save or undo)
    pub fn flush_all(&mut self) -> Vec<ContentCommit> {
        self.regions
            .iter_mut()
            .filter_map(|(id, region)| {
                region.pending.flush().map(|markup| ContentCommit {
                    block_id: id.clone(),
                    markup,
                })
            })
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.regions.values().any(|r| r.pending.is_pending())
    }

    /// Forget a region whose block went away
    pub fn discard(&mut self, block_id: &BlockId) {
        self.regions.remove(block_id);
        if self.focused.as_ref() == Some(block_id) {
            self.focused = None;
            self.toolbar.hide();
        }
    }

    /// Forget every region, dropping pending edits
    pub fn reset(&mut self) {
        self.regions.clear();
        self.focused = None;
        self.toolbar.hide();
    }

    /// Recompute a region's style after its block's settings changed.
    /// Returns the new style if the region is live.
    pub fn restyle(&mut self, block: &Block, registry: &BlockRegistry) -> Option<InlineStyle> {
        let region = self.regions.get_mut(&block.id)?;
        region.style = registry.variant_for(block).inline_style(&block.settings);
        Some(region.style.clone())
    }

    pub fn style(&self, block_id: &BlockId) -> Option<&InlineStyle> {
        self.regions.get(block_id).map(|r| &r.style)
    }

    pub fn is_empty(&self, block_id: &BlockId) -> Option<bool> {
        self.regions.get(block_id).map(|r| r.empty)
    }

    pub fn markup(&self, block_id: &BlockId) -> Option<&str> {
        self.regions.get(block_id).map(|r| r.markup.as_str())
    }

    pub fn paste(&self, html: Option<&str>, text: Option<&str>) -> PasteContent {
        sanitize_paste(html, text)
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn toolbar_mut(&mut self) -> &mut Toolbar {
        &mut self.toolbar
    }
}
