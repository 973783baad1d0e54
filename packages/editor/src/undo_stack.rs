//! # Undo/Redo Stack
//!
//! Bounded history of whole-document snapshots.
//!
//! ## Design
//!
//! - Each discrete mutation records the document as it was *before* the change
//! - Undo hands back the previous snapshot and moves the current state to the redo side
//! - Redo is symmetric
//! - New snapshots clear the redo side
//! - The oldest snapshots are evicted once `max_levels` is reached
//! - Batches collapse several mutations into one undo level
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::with_max_levels(50);
//!
//! let before = doc.clone();
//! doc.steps[0].blocks.push(block);
//! stack.push(before, "Add block");
//!
//! if let Some(previous) = stack.undo(doc.clone()) {
//!     doc = previous;
//! }
//! ```

use crate::document::Document;
use std::collections::VecDeque;
use tracing::debug;

/// One history level
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub document: Document,
    pub label: String,
}

#[derive(Debug)]
pub struct UndoStack {
    /// Snapshots to restore on undo (most recent last)
    undo_stack: VecDeque<HistoryEntry>,

    /// Snapshots to restore on redo (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// First snapshot taken since `begin_batch`
    current_batch: Option<Option<HistoryEntry>>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record the state preceding a mutation
    pub fn push(&mut self, before: Document, label: impl Into<String>) {
        let entry = HistoryEntry {
            document: before,
            label: label.into(),
        };

        if let Some(batch) = &mut self.current_batch {
            // Only the state before the first mutation of a batch matters
            if batch.is_none() {
                *batch = Some(entry);
            }
            return;
        }

        self.redo_stack.clear();
        self.push_undo(entry);
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        debug!(label = %entry.label, levels = self.undo_stack.len() + 1, "Pushing snapshot");
        self.undo_stack.push_back(entry);

        if self.max_levels > 0 {
            while self.undo_stack.len() > self.max_levels {
                if let Some(evicted) = self.undo_stack.pop_front() {
                    debug!(label = %evicted.label, "Evicting oldest snapshot");
                }
            }
        }
    }

    /// Start grouping snapshots into a single undo level
    pub fn begin_batch(&mut self) {
        if self.current_batch.is_none() {
            self.current_batch = Some(None);
        }
    }

    /// Finish the current batch. Returns true if it recorded anything.
    pub fn end_batch(&mut self) -> bool {
        match self.current_batch.take() {
            Some(Some(entry)) => {
                self.redo_stack.clear();
                self.push_undo(entry);
                true
            }
            _ => false,
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Step back. `current` is the live document; it becomes the redo entry.
    pub fn undo(&mut self, current: Document) -> Option<Document> {
        let entry = self.undo_stack.pop_back()?;
        debug!(label = %entry.label, "Undo");
        self.redo_stack.push(HistoryEntry {
            document: current,
            label: entry.label.clone(),
        });
        Some(entry.document)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self, current: Document) -> Option<Document> {
        let entry = self.redo_stack.pop()?;
        debug!(label = %entry.label, "Redo");
        self.push_undo(HistoryEntry {
            document: current,
            label: entry.label.clone(),
        });
        Some(entry.document)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.label.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Document {
        Document {
            document_name: name.to_string(),
            ..Document::default()
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut stack = UndoStack::new();
        stack.push(named("a"), "Rename");

        let restored = stack.undo(named("b")).unwrap();
        assert_eq!(restored.document_name, "a");
        assert!(!stack.can_undo());
        assert_eq!(stack.redo_description(), Some("Rename"));

        let again = stack.redo(restored).unwrap();
        assert_eq!(again.document_name, "b");
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_empty_stack() {
        let mut stack = UndoStack::new();
        assert!(stack.undo(named("a")).is_none());
        assert!(stack.redo(named("a")).is_none());
    }

    #[test]
    fn test_new_push_clears_redo() {
        let mut stack = UndoStack::new();
        stack.push(named("a"), "one");
        stack.undo(named("b"));
        assert!(stack.can_redo());

        stack.push(named("a"), "two");
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_max_levels_evicts_oldest() {
        let mut stack = UndoStack::with_max_levels(3);
        for i in 0..5 {
            stack.push(named(&i.to_string()), format!("edit {}", i));
        }
        assert_eq!(stack.undo_levels(), 3);

        let mut current = named("5");
        let mut seen = Vec::new();
        while let Some(previous) = stack.undo(current.clone()) {
            seen.push(previous.document_name.clone());
            current = previous;
        }
        assert_eq!(seen, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_batch_is_one_level() {
        let mut stack = UndoStack::new();
        stack.begin_batch();
        stack.push(named("a"), "first");
        stack.push(named("b"), "second");
        assert_eq!(stack.undo_levels(), 0);
        assert!(stack.end_batch());

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("first"));
        assert_eq!(stack.undo(named("c")).unwrap().document_name, "a");
    }

    #[test]
    fn test_empty_batch_records_nothing() {
        let mut stack = UndoStack::new();
        stack.begin_batch();
        assert!(!stack.end_batch());
        assert!(!stack.can_undo());
    }
}
