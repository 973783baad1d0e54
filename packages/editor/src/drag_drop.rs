//! # Drag and Drop
//!
//! Turns pointer-drag gestures into insertion points within the current
//! step.
//!
//! ```text
//!  start_palette(kind) ─┐                     ┌─► drop   → Inserted / Moved / Unchanged
//!                       ├─► pointer_moved* ───┤
//!  start_reorder(id) ───┘   (debounced)       └─► cancel → surface restored
//! ```
//!
//! Drop position: the block whose vertical midpoint is closest to the
//! pointer wins (the first one on a tie); the insertion goes before it when
//! the pointer is above that midpoint and after it otherwise.
//!
//! A reorder drag never detaches the block from the surface. It is only
//! marked as lifted and shown as a placeholder, so a cancelled drag leaves
//! the block where it was and a flush mid-drag cannot lose it.

use crate::debounce::Debouncer;
use crate::errors::DragError;
use crate::surface::{Placeholder, Surface};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepcraft_blocks::{Block, BlockId, BlockRegistry};
use tracing::{debug, info};

/// Vertical extent of a rendered block, as measured by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBounds {
    pub block_id: BlockId,
    pub top: f64,
    pub height: f64,
}

impl BlockBounds {
    pub fn new(block_id: impl Into<BlockId>, top: f64, height: f64) -> Self {
        Self {
            block_id: block_id.into(),
            top,
            height,
        }
    }

    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Where a dragged block lands, relative to the blocks that stay put
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InsertionPoint {
    Before { block_id: BlockId },
    After { block_id: BlockId },
    AppendToEmpty,
}

impl InsertionPoint {
    /// Index into `resting` (the blocks not being dragged). An anchor that
    /// is no longer present resolves to the end.
    pub fn to_index<'b>(&self, resting: impl Iterator<Item = &'b Block>) -> usize {
        let resting: Vec<&Block> = resting.collect();
        let position_of = |id: &BlockId| resting.iter().position(|b| &b.id == id);
        match self {
            InsertionPoint::Before { block_id } => position_of(block_id).unwrap_or(resting.len()),
            InsertionPoint::After { block_id } => position_of(block_id).map_or(resting.len(), |i| i + 1),
            InsertionPoint::AppendToEmpty => resting.len(),
        }
    }
}

/// Resolve a pointer position against the measured blocks.
///
/// `exclude` is the block being reordered; it never serves as an anchor.
pub fn resolve_drop_position(y: f64, bounds: &[BlockBounds], exclude: Option<&BlockId>) -> InsertionPoint {
    let mut closest: Option<(&BlockBounds, f64)> = None;
    for candidate in bounds.iter().filter(|b| Some(&b.block_id) != exclude) {
        let distance = (y - candidate.midpoint()).abs();
        if closest.map_or(true, |(_, best)| distance < best) {
            closest = Some((candidate, distance));
        }
    }

    match closest {
        None => InsertionPoint::AppendToEmpty,
        Some((anchor, _)) if y < anchor.midpoint() => InsertionPoint::Before {
            block_id: anchor.block_id.clone(),
        },
        Some((anchor, _)) => InsertionPoint::After {
            block_id: anchor.block_id.clone(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DragSource {
    NewFromPalette { block_type: String },
    ExistingBlock { block_id: BlockId },
}

/// One pointer sample: the vertical coordinate plus the block boxes the
/// host measured at that moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub y: f64,
    pub bounds: Vec<BlockBounds>,
}

/// State of the drag in progress
#[derive(Debug, Clone)]
pub struct DragSession {
    pub source: DragSource,
    /// Index of the dragged block when the gesture started (reorders only)
    pub original_index: Option<usize>,
    pub last_sample: Option<PointerSample>,
    pub preview: Option<InsertionPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DropOutcome {
    Inserted {
        block_id: BlockId,
        index: usize,
        /// The variant wants its settings panel opened right away
        open_settings: bool,
    },
    Moved {
        block_id: BlockId,
        from: usize,
        to: usize,
    },
    /// Reorder onto the original position
    Unchanged,
}

#[derive(Debug)]
pub struct DragDropController {
    session: Option<DragSession>,
    preview: Debouncer<PointerSample>,
}

impl DragDropController {
    pub fn new(preview_delay: Duration) -> Self {
        Self {
            session: None,
            preview: Debouncer::new(preview_delay),
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Begin dragging a new block out of the palette
    pub fn start_palette(&mut self, block_type: &str) -> Result<(), DragError> {
        if self.session.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        debug!(block_type, "Palette drag started");
        self.session = Some(DragSession {
            source: DragSource::NewFromPalette {
                block_type: block_type.to_string(),
            },
            original_index: None,
            last_sample: None,
            preview: None,
        });
        Ok(())
    }

    /// Begin moving an existing block; a placeholder of `height` takes its
    /// place on the surface
    pub fn start_reorder(&mut self, surface: &mut Surface, block_id: &BlockId, height: f64) -> Result<(), DragError> {
        if self.session.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        let index = surface
            .position_of(block_id)
            .ok_or_else(|| DragError::BlockNotFound(block_id.clone()))?;

        debug!(block_id = %block_id, index, "Reorder drag started");
        surface.dragging = Some(block_id.clone());
        surface.placeholder = Some(Placeholder { index, height });
        self.session = Some(DragSession {
            source: DragSource::ExistingBlock {
                block_id: block_id.clone(),
            },
            original_index: Some(index),
            last_sample: None,
            preview: None,
        });
        Ok(())
    }

    /// Feed a pointer sample; the preview is recomputed once samples stop
    /// arriving for the debounce period
    pub fn pointer_moved(&mut self, sample: PointerSample, now: Duration) -> Result<(), DragError> {
        let session = self.session.as_mut().ok_or(DragError::NoActiveDrag)?;
        session.last_sample = Some(sample.clone());
        self.preview.call(sample, now);
        Ok(())
    }

    /// Apply a due preview update. Returns the new preview index.
    pub fn tick(&mut self, surface: &mut Surface, now: Duration) -> Option<usize> {
        let sample = self.preview.poll(now)?;
        self.apply_preview(surface, &sample)
    }

    fn apply_preview(&mut self, surface: &mut Surface, sample: &PointerSample) -> Option<usize> {
        let session = self.session.as_mut()?;
        let point = resolve_drop_position(sample.y, &sample.bounds, surface.dragging.as_ref());
        let index = point.to_index(surface.resting_blocks());
        if let Some(placeholder) = surface.placeholder.as_mut() {
            placeholder.index = index;
        }
        session.preview = Some(point);
        Some(index)
    }

    /// Finish the drag.
    ///
    /// Without a final sample the last one seen is used; with no sample at
    /// all a palette block is appended and a reorder is a no-op.
    pub fn drop(
        &mut self,
        surface: &mut Surface,
        registry: &BlockRegistry,
        sample: Option<PointerSample>,
    ) -> Result<DropOutcome, DragError> {
        let session = self.session.take().ok_or(DragError::NoActiveDrag)?;
        let pending = self.preview.flush();
        let sample = sample.or(pending).or(session.last_sample);

        let dragging = surface.dragging.take();
        surface.placeholder = None;

        let point = sample.map(|s| resolve_drop_position(s.y, &s.bounds, dragging.as_ref()));

        match session.source {
            DragSource::NewFromPalette { block_type } => {
                let block = registry.create_or_passthrough(&block_type, None);
                let open_settings = registry.variant_for(&block).needs_configuration(&block);
                let index = point
                    .map(|p| p.to_index(surface.blocks.iter()))
                    .unwrap_or(surface.blocks.len());

                let block_id = block.id.clone();
                let index = surface.insert(index, block);
                surface.selected = Some(block_id.clone());

                info!(block_id = %block_id, block_type = %block_type, index, "Dropped new block");
                Ok(DropOutcome::Inserted {
                    block_id,
                    index,
                    open_settings,
                })
            }
            DragSource::ExistingBlock { block_id } => {
                let from = surface
                    .position_of(&block_id)
                    .ok_or_else(|| DragError::BlockNotFound(block_id.clone()))?;
                let to = match point {
                    Some(p) => p.to_index(surface.blocks.iter().filter(|b| b.id != block_id)),
                    None => from,
                };

                if to == from {
                    debug!(block_id = %block_id, index = from, "Block dropped onto itself");
                    return Ok(DropOutcome::Unchanged);
                }

                let block = surface.blocks.remove(from);
                surface.insert(to, block);
                info!(block_id = %block_id, from, to, "Moved block");
                Ok(DropOutcome::Moved { block_id, from, to })
            }
        }
    }

    /// Abandon the drag. The surface is left exactly as before the drag.
    pub fn cancel(&mut self, surface: &mut Surface) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        self.preview.cancel();
        surface.dragging = None;
        surface.placeholder = None;
        debug!(source = ?session.source, "Drag cancelled");
        true
    }

    /// The pointer left the document without a drop
    pub fn pointer_left_document(&mut self, surface: &mut Surface) -> bool {
        self.cancel(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacked(surface: &Surface, height: f64) -> Vec<BlockBounds> {
        surface
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| BlockBounds::new(b.id.clone(), i as f64 * height, height))
            .collect()
    }

    fn surface_with(count: usize) -> Surface {
        let mut surface = Surface::default();
        for _ in 0..count {
            surface.blocks.push(Block::new("spacer"));
        }
        surface
    }

    fn ids(surface: &Surface) -> Vec<BlockId> {
        surface.blocks.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_lower_edge_of_first_block_inserts_after_it() {
        let surface = surface_with(3);
        let bounds = stacked(&surface, 100.0);

        let point = resolve_drop_position(100.0, &bounds, None);
        assert_eq!(
            point,
            InsertionPoint::After {
                block_id: surface.blocks[0].id.clone()
            }
        );
        assert_eq!(point.to_index(surface.blocks.iter()), 1);
    }

    #[test]
    fn test_above_and_below_midpoint() {
        let surface = surface_with(3);
        let bounds = stacked(&surface, 100.0);

        assert_eq!(resolve_drop_position(-20.0, &bounds, None).to_index(surface.blocks.iter()), 0);
        assert_eq!(resolve_drop_position(140.0, &bounds, None).to_index(surface.blocks.iter()), 1);
        assert_eq!(resolve_drop_position(150.0, &bounds, None).to_index(surface.blocks.iter()), 2);
        assert_eq!(resolve_drop_position(900.0, &bounds, None).to_index(surface.blocks.iter()), 3);
    }

    #[test]
    fn test_empty_step_appends() {
        assert_eq!(resolve_drop_position(10.0, &[], None), InsertionPoint::AppendToEmpty);

        let surface = surface_with(1);
        let bounds = stacked(&surface, 50.0);
        assert_eq!(
            resolve_drop_position(10.0, &bounds, Some(&surface.blocks[0].id)),
            InsertionPoint::AppendToEmpty
        );
    }

    #[test]
    fn test_palette_drop_inserts_and_selects() {
        let registry = BlockRegistry::with_builtins();
        let mut surface = surface_with(2);
        let bounds = stacked(&surface, 100.0);
        let mut drag = DragDropController::new(Duration::from_millis(16));

        drag.start_palette("text").unwrap();
        assert_eq!(drag.start_palette("text"), Err(DragError::AlreadyDragging));

        let outcome = drag
            .drop(&mut surface, &registry, Some(PointerSample { y: 120.0, bounds }))
            .unwrap();
        let DropOutcome::Inserted {
            block_id,
            index,
            open_settings,
        } = outcome
        else {
            panic!("expected an insert");
        };

        assert_eq!(index, 1);
        assert!(!open_settings);
        assert_eq!(surface.blocks[1].id, block_id);
        assert_eq!(surface.blocks[1].kind, "text");
        assert_eq!(surface.selected, Some(block_id));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_palette_drop_opens_settings_for_unconfigured_form() {
        let registry = BlockRegistry::with_builtins();
        let mut surface = Surface::default();
        let mut drag = DragDropController::new(Duration::from_millis(16));

        drag.start_palette("form").unwrap();
        let outcome = drag.drop(&mut surface, &registry, None).unwrap();
        assert!(matches!(
            outcome,
            DropOutcome::Inserted {
                index: 0,
                open_settings: true,
                ..
            }
        ));
    }

    #[test]
    fn test_reorder_moves_block() {
        let registry = BlockRegistry::with_builtins();
        let mut surface = surface_with(3);
        let original = ids(&surface);
        let bounds = stacked(&surface, 100.0);
        let mut drag = DragDropController::new(Duration::from_millis(16));

        drag.start_reorder(&mut surface, &original[0], 100.0).unwrap();
        assert_eq!(surface.placeholder, Some(Placeholder { index: 0, height: 100.0 }));

        let outcome = drag
            .drop(&mut surface, &registry, Some(PointerSample { y: 290.0, bounds }))
            .unwrap();
        assert_eq!(
            outcome,
            DropOutcome::Moved {
                block_id: original[0].clone(),
                from: 0,
                to: 2
            }
        );
        assert_eq!(ids(&surface), vec![original[1].clone(), original[2].clone(), original[0].clone()]);
        assert!(surface.placeholder.is_none());
        assert!(surface.dragging.is_none());
    }

    #[test]
    fn test_reorder_onto_itself_is_noop() {
        let registry = BlockRegistry::with_builtins();
        let mut surface = surface_with(3);
        let original = ids(&surface);
        let bounds = stacked(&surface, 100.0);
        let mut drag = DragDropController::new(Duration::from_millis(16));

        drag.start_reorder(&mut surface, &original[1], 100.0).unwrap();
        let outcome = drag
            .drop(&mut surface, &registry, Some(PointerSample { y: 150.0, bounds }))
            .unwrap();

        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(ids(&surface), original);
    }

    #[test]
    fn test_cancel_restores_surface() {
        let mut surface = surface_with(3);
        let original = ids(&surface);
        let bounds = stacked(&surface, 100.0);
        let mut drag = DragDropController::new(Duration::from_millis(16));

        drag.start_reorder(&mut surface, &original[2], 100.0).unwrap();
        drag.pointer_moved(PointerSample { y: 0.0, bounds }, Duration::from_millis(0))
            .unwrap();
        assert_eq!(drag.tick(&mut surface, Duration::from_millis(20)), Some(0));
        assert_eq!(surface.placeholder.map(|p| p.index), Some(0));

        assert!(drag.pointer_left_document(&mut surface));
        assert_eq!(ids(&surface), original);
        assert!(surface.placeholder.is_none());
        assert!(!drag.cancel(&mut surface));
    }

    #[test]
    fn test_preview_is_debounced() {
        let mut surface = surface_with(2);
        let bounds = stacked(&surface, 100.0);
        let mut drag = DragDropController::new(Duration::from_millis(16));
        drag.start_palette("text").unwrap();

        drag.pointer_moved(PointerSample { y: 10.0, bounds: bounds.clone() }, Duration::from_millis(0))
            .unwrap();
        drag.pointer_moved(PointerSample { y: 180.0, bounds }, Duration::from_millis(10))
            .unwrap();

        assert_eq!(drag.tick(&mut surface, Duration::from_millis(20)), None);
        assert_eq!(drag.tick(&mut surface, Duration::from_millis(26)), Some(2));
    }

    #[test]
    fn test_pointer_without_drag_is_error() {
        let mut drag = DragDropController::new(Duration::from_millis(16));
        let sample = PointerSample { y: 0.0, bounds: Vec::new() };
        assert_eq!(drag.pointer_moved(sample, Duration::ZERO), Err(DragError::NoActiveDrag));
    }
}
