//! Error types for the editor

use crate::document::StepId;
use stepcraft_blocks::{BlockError, BlockId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Drag error: {0}")]
    Drag(#[from] DragError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Formatting error: {0}")]
    Format(#[from] FormatError),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Step not found: {0}")]
    NotFound(StepId),

    #[error("Cannot delete the only remaining step")]
    DeleteLastStep,

    #[error("Step {step} has {count} empty required field(s)", count = .invalid.len())]
    ValidationFailed { step: StepId, invalid: Vec<String> },

    #[error("Invalid step order: {0}")]
    InvalidOrder(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DragError {
    #[error("No drag in progress")]
    NoActiveDrag,

    #[error("A drag is already in progress")]
    AlreadyDragging,

    #[error("Dragged block not found: {0}")]
    BlockNotFound(BlockId),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Could not serialize document: {0}")]
    Serialize(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Link URL is empty")]
    EmptyLink,

    #[error("Link URL is not allowed: {0}")]
    UnsafeLink(String),

    #[error("No editable region is focused")]
    NoFocusedRegion,
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialize(e.to_string())
    }
}
