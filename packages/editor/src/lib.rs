//! # Stepcraft Editor
//!
//! Editing engine for multi-step documents built from blocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ blocks: Block model, variants, registry     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorSession                       │
//! │  - StepManager (steps, validation guard)    │
//! │  - DragDropController (insert, reorder)     │
//! │  - InlineEditSync (+ toolbar, paste)        │
//! │  - UndoStack (document snapshots)           │
//! │  - ResourceTracker (async sub-resources)    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PersistenceBridge: Document ⇄ JSON payload  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The document is the source of truth**: rendered markup is derived
//! 2. **One session per document**: no global editor state
//! 3. **One history entry per discrete mutation**: keystrokes are debounced
//! 4. **Load never fails**: unknown data is preserved, broken data is repaired
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stepcraft_editor::{EditorConfig, EditorSession};
//! use stepcraft_blocks::BlockRegistry;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(BlockRegistry::with_builtins());
//! let mut session = EditorSession::open(registry, EditorConfig::default(), &payload);
//!
//! let heading = session.insert_block("heading", 0);
//! session.add_step();
//! session.undo();
//!
//! let payload = session.save()?;
//! ```

pub mod config;
pub mod debounce;
pub mod document;
pub mod drag_drop;
pub mod errors;
pub mod formatting;
pub mod inline_edit;
pub mod persistence;
pub mod resources;
pub mod sanitize;
pub mod session;
pub mod steps;
pub mod surface;
pub mod undo_stack;

pub use config::{EditorConfig, TransitionConfig};
pub use debounce::Debouncer;
pub use document::{
    Device, DisplaySettings, Document, Frequency, PopupPosition, PublishStatus, Step, StepId, StepSettings,
    TargetingRules, TransitionEffect, TriggerSettings, TriggerType,
};
pub use drag_drop::{
    resolve_drop_position, BlockBounds, DragDropController, DragSession, DragSource, DropOutcome, InsertionPoint,
    PointerSample,
};
pub use errors::{DragError, EditorError, FormatError, PersistenceError, ResourceError, StepError};
pub use formatting::{
    normalize_link, FormatCommand, FormatState, Point, Rect, SelectionInfo, Toolbar, ToolbarAction, ToolbarState,
    Viewport,
};
pub use inline_edit::{is_visually_empty, ContentCommit, InlineEditSync};
pub use persistence::{DocumentStore, LoadOutcome, LoadWarning, MemoryStore, PersistenceBridge};
pub use resources::{
    fetch, Asset, AssetUploader, FetchCompletion, FetchOutcome, FetchTicket, MemoryResolver, ResourceResolver,
    ResourceTracker,
};
#[cfg(feature = "async")]
pub use resources::spawn_fetch;
pub use sanitize::{sanitize_paste, PasteContent};
pub use session::{EditorSession, Notice, NoticeLevel, Tick};
pub use steps::{StepManager, Transition};
pub use surface::{Placeholder, RenderedField, Surface};
pub use undo_stack::{HistoryEntry, UndoStack};
