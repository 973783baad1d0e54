//! # Step Manager
//!
//! State machine over the document's steps. Exactly one step is current;
//! the surface mirrors it.
//!
//! ```text
//!   switch_to(target)
//!        │
//!        ├─ target missing ───────────────► Err(NotFound)
//!        ├─ validation on, field empty ───► Err(ValidationFailed), fields flagged
//!        │
//!        ▼
//!   flush surface → step.blocks
//!   current_step_id = target
//!   reload surface from target
//!        │
//!        ▼
//!   Ok(Transition { effect, duration })
//! ```
//!
//! Every structural operation keeps step ids equal to `1..=N`.

use crate::config::EditorConfig;
use crate::document::{Document, Step, StepId, StepSettings, TransitionEffect};
use crate::errors::StepError;
use crate::surface::Surface;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Visual transition the host should play after a step switch.
/// The model change has already happened when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: StepId,
    pub to: StepId,
    pub effect: TransitionEffect,
    pub duration_ms: u32,
}

pub struct StepManager<'a> {
    document: &'a mut Document,
    surface: &'a mut Surface,
    config: &'a EditorConfig,
}

impl<'a> StepManager<'a> {
    pub fn new(document: &'a mut Document, surface: &'a mut Surface, config: &'a EditorConfig) -> Self {
        Self {
            document,
            surface,
            config,
        }
    }

    /// Write the surface's block list back into its step
    pub fn flush(&mut self) {
        if let Some(step) = self.document.step_mut(self.surface.step_id) {
            if step.blocks != self.surface.blocks {
                debug!(step = %step.id, blocks = self.surface.blocks.len(), "Flushing surface into step");
                step.blocks = self.surface.blocks.clone();
            }
        }
    }

    /// Rebuild the surface from the current step
    pub fn reload(&mut self) {
        if let Some(step) = self.document.current_step() {
            *self.surface = Surface::load(step);
        }
    }

    pub fn current(&self) -> StepId {
        self.document.current_step_id
    }

    fn new_step_settings(&self) -> StepSettings {
        StepSettings {
            transition_effect: self.config.default_transition.effect,
            transition_duration: self.config.default_transition.duration_ms,
            ..StepSettings::default()
        }
    }

    fn make_current(&mut self, id: StepId) {
        self.document.current_step_id = id;
        self.reload();
    }

    /// The current step survived a structural change, possibly under a new
    /// id. The surface (selection, typed field values) is kept as is.
    fn follow_current(&mut self, id: StepId) {
        self.document.current_step_id = id;
        self.surface.step_id = id;
    }

    /// Append a step with default settings and make it current
    pub fn add_step(&mut self) -> StepId {
        self.flush();

        let id = StepId::from_index(self.document.steps.len());
        let mut step = Step::new(id, self.config.step_name(id.0 as usize));
        step.settings = self.new_step_settings();
        self.document.steps.push(step);

        info!(step = %id, "Added step");
        self.make_current(id);
        id
    }

    /// Deep-copy a step (fresh block ids) right after the source and make
    /// the copy current
    pub fn duplicate_step(&mut self, id: StepId) -> Result<StepId, StepError> {
        self.flush();

        let source = self.document.step(id).ok_or(StepError::NotFound(id))?;
        let copy_id = StepId(id.0 + 1);
        let copy = source.duplicate(copy_id, format!("{} (copy)", source.name));

        self.document.steps.insert(copy_id.index(), copy);
        self.document.renumber();

        info!(source = %id, step = %copy_id, "Duplicated step");
        self.make_current(copy_id);
        Ok(copy_id)
    }

    /// Rename a step. Returns false (and keeps the old name) when the new
    /// name is blank or unchanged.
    pub fn rename_step(&mut self, id: StepId, name: &str) -> Result<bool, StepError> {
        let step = self.document.step_mut(id).ok_or(StepError::NotFound(id))?;
        let name = name.trim();
        if name.is_empty() || name == step.name {
            return Ok(false);
        }

        debug!(step = %id, name, "Renamed step");
        step.name = name.to_string();
        Ok(true)
    }

    /// Remove a step. The sole remaining step can never be deleted.
    pub fn delete_step(&mut self, id: StepId) -> Result<(), StepError> {
        if self.document.step(id).is_none() {
            return Err(StepError::NotFound(id));
        }
        if self.document.step_count() == 1 {
            return Err(StepError::DeleteLastStep);
        }

        self.flush();
        let current = self.document.current_step_id;
        self.document.steps.remove(id.index());
        self.document.renumber();

        let next = if current == id {
            // Same ordinal, or the new last step
            StepId::from_index(id.index().min(self.document.step_count() - 1))
        } else if current > id {
            StepId(current.0 - 1)
        } else {
            current
        };

        info!(step = %id, current = %next, "Deleted step");
        if current == id {
            self.make_current(next);
        } else {
            self.follow_current(next);
        }
        Ok(())
    }

    /// Replace the step order. `order` lists every existing step id exactly
    /// once, in the new order.
    pub fn reorder_steps(&mut self, order: &[StepId]) -> Result<(), StepError> {
        let count = self.document.step_count();
        if order.len() != count {
            return Err(StepError::InvalidOrder(format!(
                "expected {} steps, got {}",
                count,
                order.len()
            )));
        }
        let unique: BTreeSet<StepId> = order.iter().copied().collect();
        if unique.len() != count || order.iter().any(|id| id.0 == 0 || id.index() >= count) {
            return Err(StepError::InvalidOrder(
                "order must be a permutation of the existing step ids".to_string(),
            ));
        }

        self.flush();
        let current = self.document.current_step_id;
        let mut old: Vec<Option<Step>> = std::mem::take(&mut self.document.steps)
            .into_iter()
            .map(Some)
            .collect();

        let mut new_current = current;
        for (position, id) in order.iter().enumerate() {
            if *id == current {
                new_current = StepId::from_index(position);
            }
            if let Some(step) = old[id.index()].take() {
                self.document.steps.push(step);
            }
        }
        self.document.renumber();

        debug!(?order, current = %new_current, "Reordered steps");
        self.follow_current(new_current);
        Ok(())
    }

    /// Make `target` current.
    ///
    /// When the step being left has validation enabled, every required field
    /// on the surface must be filled; otherwise the switch is refused, the
    /// empty fields are flagged and nothing else changes.
    pub fn switch_to(&mut self, target: StepId) -> Result<Transition, StepError> {
        let target_step = self.document.step(target).ok_or(StepError::NotFound(target))?;
        let transition = Transition {
            from: self.document.current_step_id,
            to: target,
            effect: target_step.settings.transition_effect,
            duration_ms: target_step.settings.transition_duration,
        };

        if target == transition.from {
            return Ok(transition);
        }

        let validation = self
            .document
            .current_step()
            .map(|s| s.settings.validation)
            .unwrap_or(false);
        if validation {
            let missing = self.surface.missing_required();
            if !missing.is_empty() {
                self.surface.flag_invalid(&missing);
                info!(step = %transition.from, missing = missing.len(), "Step validation failed");
                return Err(StepError::ValidationFailed {
                    step: transition.from,
                    invalid: missing,
                });
            }
        }

        self.flush();
        info!(from = %transition.from, to = %target, "Switching step");
        self.make_current(target);
        Ok(transition)
    }

    /// Switch to the following step, if any
    pub fn next_step(&mut self) -> Result<Option<Transition>, StepError> {
        let current = self.document.current_step_id;
        if current.index() + 1 >= self.document.step_count() {
            return Ok(None);
        }
        self.switch_to(StepId(current.0 + 1)).map(Some)
    }

    /// Switch to the preceding step, if any
    pub fn previous_step(&mut self) -> Result<Option<Transition>, StepError> {
        let current = self.document.current_step_id;
        if current.0 <= 1 {
            return Ok(None);
        }
        self.switch_to(StepId(current.0 - 1)).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepcraft_blocks::settings::to_settings;
    use stepcraft_blocks::{Block, BlockRegistry};

    fn setup() -> (Document, Surface, EditorConfig) {
        let document = Document::default();
        let surface = Surface::load(&document.steps[0]);
        (document, surface, EditorConfig::default())
    }

    fn ids(document: &Document) -> Vec<u32> {
        document.steps.iter().map(|s| s.id.0).collect()
    }

    #[test]
    fn test_add_step_becomes_current() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);

        let id = steps.add_step();
        assert_eq!(id, StepId(2));
        assert_eq!(steps.current(), StepId(2));
        drop(steps);

        assert_eq!(doc.steps[1].name, "Step 2");
        assert_eq!(surface.step_id, StepId(2));
    }

    #[test]
    fn test_delete_last_step_rejected() {
        let (mut doc, mut surface, config) = setup();
        let before = doc.clone();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);

        assert_eq!(steps.delete_step(StepId(1)), Err(StepError::DeleteLastStep));
        drop(steps);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_delete_current_moves_to_same_ordinal() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();
        steps.add_step();
        steps.switch_to(StepId(2)).unwrap();

        steps.delete_step(StepId(2)).unwrap();
        assert_eq!(steps.current(), StepId(2));

        steps.delete_step(StepId(2)).unwrap();
        assert_eq!(steps.current(), StepId(1));
        drop(steps);
        assert_eq!(ids(&doc), vec![1]);
    }

    #[test]
    fn test_delete_before_current_shifts_current() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();
        steps.add_step();

        steps.delete_step(StepId(1)).unwrap();
        assert_eq!(steps.current(), StepId(2));
        drop(steps);
        assert_eq!(doc.steps[1].name, "Step 3");
        assert_eq!(ids(&doc), vec![1, 2]);
    }

    #[test]
    fn test_delete_other_step_keeps_surface() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();
        steps.add_step();
        drop(steps);

        let block = Block::new("spacer");
        let block_id = block.id.clone();
        surface.insert(0, block);
        surface.selected = Some(block_id.clone());

        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.delete_step(StepId(1)).unwrap();
        assert_eq!(steps.current(), StepId(2));
        drop(steps);

        assert_eq!(surface.step_id, StepId(2));
        assert_eq!(surface.selected, Some(block_id.clone()));
        assert_eq!(doc.steps[1].blocks[0].id, block_id);
    }

    #[test]
    fn test_reorder_renumbers_and_follows_current() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();
        steps.add_step();
        steps.switch_to(StepId(1)).unwrap();

        steps
            .reorder_steps(&[StepId(3), StepId(1), StepId(2)])
            .unwrap();
        assert_eq!(steps.current(), StepId(2));
        drop(steps);

        assert_eq!(ids(&doc), vec![1, 2, 3]);
        let names: Vec<_> = doc.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Step 3", "Step 1", "Step 2"]);
    }

    #[test]
    fn test_reorder_rejects_non_permutation() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();

        assert!(matches!(
            steps.reorder_steps(&[StepId(1), StepId(1)]),
            Err(StepError::InvalidOrder(_))
        ));
        assert!(matches!(
            steps.reorder_steps(&[StepId(1)]),
            Err(StepError::InvalidOrder(_))
        ));
        assert!(matches!(
            steps.reorder_steps(&[StepId(2), StepId(3)]),
            Err(StepError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_rename_blank_is_noop() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);

        assert_eq!(steps.rename_step(StepId(1), "   "), Ok(false));
        assert_eq!(steps.rename_step(StepId(1), "  Welcome "), Ok(true));
        assert_eq!(steps.rename_step(StepId(9), "x"), Err(StepError::NotFound(StepId(9))));
        drop(steps);
        assert_eq!(doc.steps[0].name, "Welcome");
    }

    #[test]
    fn test_switch_flushes_surface() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();
        steps.switch_to(StepId(1)).unwrap();
        drop(steps);

        surface.insert(0, Block::new("spacer"));
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        let transition = steps.switch_to(StepId(2)).unwrap();
        drop(steps);

        assert_eq!(transition.from, StepId(1));
        assert_eq!(transition.to, StepId(2));
        assert_eq!(transition.effect, TransitionEffect::Fade);
        assert_eq!(doc.steps[0].blocks.len(), 1);
        assert!(surface.blocks.is_empty());
    }

    #[test]
    fn test_validation_guard() {
        let registry = BlockRegistry::with_builtins();
        let (mut doc, mut surface, config) = setup();
        doc.steps[0].settings.validation = true;
        let input = registry
            .create("input", Some(to_settings(&json!({"required": true}))))
            .unwrap();
        let key = input.id.to_string();
        doc.steps[0].blocks.push(input);
        doc.steps.push(Step::new(StepId(2), "Step 2"));

        surface = Surface::load(&doc.steps[0]);
        surface.refresh_fields(&registry, |_| None);

        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        let err = steps.switch_to(StepId(2)).unwrap_err();
        assert_eq!(
            err,
            StepError::ValidationFailed {
                step: StepId(1),
                invalid: vec![key.clone()]
            }
        );
        assert_eq!(steps.current(), StepId(1));
        drop(steps);
        assert_eq!(surface.invalid_fields(), vec![key.as_str()]);

        surface.set_field_value(&key, "me@example.com");
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        assert!(steps.switch_to(StepId(2)).is_ok());
        assert_eq!(steps.current(), StepId(2));
    }

    #[test]
    fn test_next_and_previous() {
        let (mut doc, mut surface, config) = setup();
        let mut steps = StepManager::new(&mut doc, &mut surface, &config);
        steps.add_step();

        assert_eq!(steps.next_step(), Ok(None));
        let back = steps.previous_step().unwrap().unwrap();
        assert_eq!(back.to, StepId(1));
        assert_eq!(steps.previous_step(), Ok(None));
    }
}
