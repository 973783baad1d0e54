//! # Persistence Bridge
//!
//! Converts the document to and from the JSON payload exchanged with the
//! storage collaborator:
//!
//! ```text
//! { documentName, documentType, status, steps: [{ id, name, blocks, settings }],
//!   settings, triggerSettings, targetingRules, currentStepId }
//! ```
//!
//! Loading never fails. Unknown fields are ignored, missing ones defaulted,
//! and an unreadable payload yields a fresh document plus a warning.

use crate::document::{Document, Step, StepId};
use crate::errors::PersistenceError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;
use stepcraft_blocks::{BlockId, BlockRegistry};
use tracing::{debug, warn};

/// Something that was repaired while loading a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The payload could not be read; a default document was used instead
    SerializationMismatch(String),
    /// The payload had no steps; a default step was added
    MissingSteps,
    /// Step ids were not `1..=N` and have been renumbered
    StepsRenumbered,
    CurrentStepReset { requested: StepId },
    DuplicateBlockId { original: BlockId, replacement: BlockId },
    /// Preserved verbatim as a pass-through block
    UnknownBlockType { kind: String, block_id: BlockId },
}

impl LoadWarning {
    /// Whether the author should be told about it
    pub fn is_user_facing(&self) -> bool {
        matches!(self, LoadWarning::SerializationMismatch(_))
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::SerializationMismatch(reason) => {
                write!(f, "The saved document could not be read and was reset: {}", reason)
            }
            LoadWarning::MissingSteps => write!(f, "The saved document had no steps"),
            LoadWarning::StepsRenumbered => write!(f, "Step numbers were repaired"),
            LoadWarning::CurrentStepReset { requested } => {
                write!(f, "Step {} does not exist, opened step 1 instead", requested)
            }
            LoadWarning::DuplicateBlockId { original, replacement } => {
                write!(f, "Duplicate block id {} was replaced with {}", original, replacement)
            }
            LoadWarning::UnknownBlockType { kind, block_id } => {
                write!(f, "Block {} has unknown type '{}' and was kept as-is", block_id, kind)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub document: Document,
    pub warnings: Vec<LoadWarning>,
}

impl LoadOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct PersistenceBridge;

impl PersistenceBridge {
    pub fn to_value(document: &Document) -> Result<Value, PersistenceError> {
        Ok(serde_json::to_value(document)?)
    }

    pub fn serialize(document: &Document) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(document)?)
    }

    /// Parse and hydrate a payload
    pub fn deserialize(payload: &str, registry: &BlockRegistry) -> LoadOutcome {
        match serde_json::from_str::<Document>(payload) {
            Ok(document) => Self::hydrate(document, registry),
            Err(e) => {
                warn!(error = %e, "Unreadable document payload, starting from a default document");
                LoadOutcome {
                    document: Document::default(),
                    warnings: vec![LoadWarning::SerializationMismatch(e.to_string())],
                }
            }
        }
    }

    /// Like [`deserialize`](Self::deserialize), from an already parsed value
    pub fn from_value(payload: Value, registry: &BlockRegistry) -> LoadOutcome {
        match serde_json::from_value::<Document>(payload) {
            Ok(document) => Self::hydrate(document, registry),
            Err(e) => {
                warn!(error = %e, "Unreadable document payload, starting from a default document");
                LoadOutcome {
                    document: Document::default(),
                    warnings: vec![LoadWarning::SerializationMismatch(e.to_string())],
                }
            }
        }
    }

    /// Repair structural invariants and bring blocks into their in-editor form
    pub fn hydrate(mut document: Document, registry: &BlockRegistry) -> LoadOutcome {
        let mut warnings = Vec::new();

        if document.steps.is_empty() {
            warnings.push(LoadWarning::MissingSteps);
            document.steps.push(Step::default());
        }

        let contiguous = document
            .steps
            .iter()
            .enumerate()
            .all(|(i, s)| s.id == StepId::from_index(i));
        if !contiguous {
            // Keep pointing at the same step if the requested id exists
            let requested = document.current_step_id;
            if let Some(position) = document.steps.iter().position(|s| s.id == requested) {
                document.current_step_id = StepId::from_index(position);
            }
            document.renumber();
            warnings.push(LoadWarning::StepsRenumbered);
        }

        if document.step(document.current_step_id).is_none() {
            warnings.push(LoadWarning::CurrentStepReset {
                requested: document.current_step_id,
            });
            document.current_step_id = StepId::FIRST;
        }

        let mut seen = HashSet::new();
        for step in &mut document.steps {
            let blocks = std::mem::take(&mut step.blocks);
            for mut block in blocks {
                if !seen.insert(block.id.clone()) {
                    let replacement = BlockId::generate();
                    warnings.push(LoadWarning::DuplicateBlockId {
                        original: block.id.clone(),
                        replacement: replacement.clone(),
                    });
                    block.id = replacement.clone();
                    seen.insert(replacement);
                }
                if !registry.is_registered(&block.kind) {
                    warnings.push(LoadWarning::UnknownBlockType {
                        kind: block.kind.clone(),
                        block_id: block.id.clone(),
                    });
                }
                step.blocks.push(registry.hydrate(block));
            }
        }

        debug!(
            steps = document.step_count(),
            blocks = document.block_count(),
            warnings = warnings.len(),
            "Hydrated document"
        );
        LoadOutcome { document, warnings }
    }
}

/// Storage collaborator that keeps serialized payloads
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, id: &str, payload: &str) -> Result<(), PersistenceError>;

    async fn load(&self, id: &str) -> Result<String, PersistenceError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload stored under `id`
    pub fn get(&self, id: &str) -> Option<String> {
        self.documents.read().ok()?.get(id).cloned()
    }

    pub fn insert(&self, id: &str, payload: impl Into<String>) {
        if let Ok(mut documents) = self.documents.write() {
            documents.insert(id.to_string(), payload.into());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save(&self, id: &str, payload: &str) -> Result<(), PersistenceError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| PersistenceError::Store("store lock poisoned".to_string()))?;
        documents.insert(id.to_string(), payload.to_string());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<String, PersistenceError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| PersistenceError::Store("store lock poisoned".to_string()))?;
        documents
            .get(id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }
}
