//! Error types for the block model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Unknown block type: {0}")]
    UnknownType(String),

    #[error("Invalid value for setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl BlockError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        BlockError::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
