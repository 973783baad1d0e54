//! # Block
//!
//! The smallest unit of content inside a step. A block is plain data: which
//! variant interprets it is decided by the registry from `kind`.

use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Presentational overrides that are not modelled as settings
/// (CSS classes, legacy inline styles, DOM-sourced attributes).
pub type Attributes = serde_json::Map<String, Value>;

/// Opaque block identifier, stable for the lifetime of a block
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(format!("blk-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A block as stored in a step and as written to the persistence payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default = "BlockId::generate")]
    pub id: BlockId,

    /// Variant discriminator
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Raw rich-text payload for text-bearing variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub settings: Settings,
}

impl Block {
    /// Create a block with a fresh id and empty settings
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            kind: kind.into(),
            content: None,
            attributes: Attributes::new(),
            settings: Settings::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Deep copy with a freshly generated id
    pub fn duplicate(&self) -> Self {
        Self {
            id: BlockId::generate(),
            ..self.clone()
        }
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    pub fn set_setting(&mut self, key: &str, value: impl Into<Value>) {
        self.settings.insert(key.to_string(), value.into());
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }
}
