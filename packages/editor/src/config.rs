//! Editor configuration.
//!
//! Every field has a default, so a host may pass a partial JSON object (or
//! nothing at all).

use crate::document::TransitionEffect;
use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo levels kept (oldest evicted first)
    pub history_limit: usize,

    /// Quiet period before an inline edit is written back to its block
    pub inline_debounce_ms: u64,

    /// Quiet period before a drag preview position is recomputed
    pub drag_preview_debounce_ms: u64,

    /// Prefix used for new step names ("Step 3")
    pub default_step_name: String,

    pub default_transition: TransitionConfig,

    /// Distance kept between the formatting toolbar and the viewport edge (px)
    pub toolbar_margin: f64,

    /// Formatting toolbar size (px), used for viewport clamping
    pub toolbar_width: f64,
    pub toolbar_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    #[serde(deserialize_with = "stepcraft_blocks::settings::lenient")]
    pub effect: TransitionEffect,
    pub duration_ms: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            effect: TransitionEffect::Fade,
            duration_ms: 300,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            inline_debounce_ms: 300,
            drag_preview_debounce_ms: 16,
            default_step_name: "Step".to_string(),
            default_transition: TransitionConfig::default(),
            toolbar_margin: 8.0,
            toolbar_width: 280.0,
            toolbar_height: 36.0,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json(source: &str) -> Result<Self, EditorError> {
        serde_json::from_str(source).map_err(|e| EditorError::Config(e.to_string()))
    }

    pub fn inline_debounce(&self) -> Duration {
        Duration::from_millis(self.inline_debounce_ms)
    }

    pub fn drag_preview_debounce(&self) -> Duration {
        Duration::from_millis(self.drag_preview_debounce_ms)
    }

    pub fn step_name(&self, position: usize) -> String {
        format!("{} {}", self.default_step_name, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"history_limit": 5, "unknown": true}"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.inline_debounce_ms, 300);
        assert_eq!(config.default_step_name, "Step");
    }

    #[test]
    fn test_unknown_transition_falls_back() {
        let config =
            EditorConfig::from_json(r#"{"default_transition": {"effect": "spiral", "duration_ms": 500}}"#).unwrap();
        assert_eq!(config.default_transition.effect, TransitionEffect::Fade);
        assert_eq!(config.default_transition.duration_ms, 500);
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(matches!(EditorConfig::from_json("{"), Err(EditorError::Config(_))));
    }

    #[test]
    fn test_step_name() {
        assert_eq!(EditorConfig::default().step_name(3), "Step 3");
    }
}
