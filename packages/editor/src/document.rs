//! # Document Model
//!
//! A document is an ordered list of steps, each an ordered list of blocks,
//! plus document-level display, trigger and targeting settings.
//!
//! Every struct here deserializes leniently: missing fields take their
//! defaults, unknown fields are ignored and unknown enum values fall back to
//! the default variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use stepcraft_blocks::settings::lenient;
use stepcraft_blocks::{Block, BlockId};

/// 1-based step position. Always equal to the step's ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub u32);

impl StepId {
    pub const FIRST: StepId = StepId(1);

    pub fn from_index(index: usize) -> Self {
        StepId(index as u32 + 1)
    }

    pub fn index(&self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

impl Default for StepId {
    fn default() -> Self {
        StepId::FIRST
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionEffect {
    None,
    #[default]
    Fade,
    SlideLeft,
    SlideRight,
    SlideUp,
    Zoom,
}

impl TransitionEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionEffect::None => "none",
            TransitionEffect::Fade => "fade",
            TransitionEffect::SlideLeft => "slide-left",
            TransitionEffect::SlideRight => "slide-right",
            TransitionEffect::SlideUp => "slide-up",
            TransitionEffect::Zoom => "zoom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepSettings {
    #[serde(deserialize_with = "lenient")]
    pub transition_effect: TransitionEffect,

    /// Milliseconds
    pub transition_duration: u32,

    /// Required fields must be filled before leaving the step
    pub validation: bool,

    pub skippable: bool,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            transition_effect: TransitionEffect::Fade,
            transition_duration: 300,
            validation: false,
            skippable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    pub blocks: Vec<Block>,
    pub settings: StepSettings,
}

impl Step {
    pub fn new(id: StepId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            blocks: Vec::new(),
            settings: StepSettings::default(),
        }
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn position_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// Deep copy with fresh block ids
    pub fn duplicate(&self, id: StepId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            blocks: self.blocks.iter().map(Block::duplicate).collect(),
            settings: self.settings.clone(),
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Step::new(StepId::FIRST, "Step 1")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopupPosition {
    #[default]
    Center,
    Top,
    Bottom,
    BottomRight,
    BottomLeft,
}

/// How the popup is presented on the public page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplaySettings {
    pub width: u32,
    pub background_color: String,
    pub overlay_color: String,
    pub show_close_button: bool,
    #[serde(deserialize_with = "lenient")]
    pub position: PopupPosition,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 600,
            background_color: "#ffffff".to_string(),
            overlay_color: "rgba(0, 0, 0, 0.5)".to_string(),
            show_close_button: true,
            position: PopupPosition::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerType {
    #[default]
    PageLoad,
    ExitIntent,
    Scroll,
    Click,
    Inactivity,
    TimeOnPage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    #[default]
    EveryVisit,
    OncePerSession,
    OnceEveryDays,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerSettings {
    #[serde(deserialize_with = "lenient")]
    pub trigger_type: TriggerType,
    pub delay_seconds: u32,
    pub scroll_percentage: u8,
    pub click_selector: String,
    pub inactivity_seconds: u32,
    #[serde(deserialize_with = "lenient")]
    pub frequency: Frequency,
    pub frequency_days: u32,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            trigger_type: TriggerType::PageLoad,
            delay_seconds: 0,
            scroll_percentage: 50,
            click_selector: String::new(),
            inactivity_seconds: 30,
            frequency: Frequency::EveryVisit,
            frequency_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Tablet,
    Mobile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetingRules {
    #[serde(deserialize_with = "known_devices")]
    pub devices: Vec<Device>,
    pub include_pages: Vec<String>,
    pub exclude_pages: Vec<String>,
    pub new_visitors_only: bool,
}

impl Default for TargetingRules {
    fn default() -> Self {
        Self {
            devices: vec![Device::Desktop, Device::Tablet, Device::Mobile],
            include_pages: Vec::new(),
            exclude_pages: Vec::new(),
            new_visitors_only: false,
        }
    }
}

/// Keep the devices we know, drop the rest
fn known_devices<'de, D>(deserializer: D) -> Result<Vec<Device>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Document {
    pub document_name: String,
    pub document_type: String,
    #[serde(deserialize_with = "lenient")]
    pub status: PublishStatus,
    pub steps: Vec<Step>,
    pub settings: DisplaySettings,
    pub trigger_settings: TriggerSettings,
    pub targeting_rules: TargetingRules,
    pub current_step_id: StepId,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            document_name: "Untitled popup".to_string(),
            document_type: "popup".to_string(),
            status: PublishStatus::Draft,
            steps: vec![Step::default()],
            settings: DisplaySettings::default(),
            trigger_settings: TriggerSettings::default(),
            targeting_rules: TargetingRules::default(),
            current_step_id: StepId::FIRST,
        }
    }
}

impl Document {
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.index()).filter(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.get_mut(id.index()).filter(|s| s.id == id)
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.step(self.current_step_id)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn last_step_id(&self) -> StepId {
        StepId::from_index(self.steps.len().saturating_sub(1))
    }

    /// Reassign step ids so they equal 1-based positions
    pub fn renumber(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.id = StepId::from_index(index);
        }
    }

    /// Locate a block in any step
    pub fn find_block(&self, id: &BlockId) -> Option<(StepId, &Block)> {
        self.steps
            .iter()
            .find_map(|step| step.block(id).map(|block| (step.id, block)))
    }

    pub fn block_count(&self) -> usize {
        self.steps.iter().map(|s| s.blocks.len()).sum()
    }

    pub fn all_blocks(&self) -> impl Iterator<Item = &Block> {
        self.steps.iter().flat_map(|s| s.blocks.iter())
    }
}
