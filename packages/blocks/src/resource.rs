//! Values describing externally stored entities referenced by blocks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One input of an externally defined form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
}

fn default_field_type() -> String {
    "text".to_string()
}

/// Resolved external entity: display name plus its structured definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ResourceField>,
    #[serde(default)]
    pub definition: Value,
}

/// Render state of a block that references an external entity
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState {
    Loading { reference: String },
    Resolved(ExternalResource),
    Unavailable { reference: String, reason: String },
}

impl ResourceState {
    pub fn reference(&self) -> &str {
        match self {
            ResourceState::Loading { reference } => reference,
            ResourceState::Resolved(resource) => &resource.id,
            ResourceState::Unavailable { reference, .. } => reference,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ResourceState::Loading { .. })
    }
}
