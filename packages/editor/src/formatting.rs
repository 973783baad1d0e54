//! Floating formatting toolbar.
//!
//! The toolbar is a pure model: the host reports the selection and viewport,
//! and runs the [`ToolbarAction`]s returned by [`Toolbar::apply`] against the
//! focused region.

use crate::config::EditorConfig;
use crate::errors::FormatError;
use serde::{Deserialize, Serialize};
use stepcraft_blocks::Alignment;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Formatting present on the current selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub alignment: Option<Alignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionInfo {
    pub collapsed: bool,
    pub rect: Rect,
    #[serde(default)]
    pub formats: FormatState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ToolbarState {
    pub visible: bool,
    pub position: Option<Point>,
    pub active: FormatState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "kebab-case")]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Align(Alignment),
    Link(String),
    ClearFormatting,
}

/// Command for the host to execute on the focused region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ToolbarAction {
    Exec { command: String, value: Option<String> },
}

impl ToolbarAction {
    fn exec(command: &str) -> Self {
        ToolbarAction::Exec {
            command: command.to_string(),
            value: None,
        }
    }

    fn exec_with(command: &str, value: String) -> Self {
        ToolbarAction::Exec {
            command: command.to_string(),
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toolbar {
    state: ToolbarState,
    width: f64,
    height: f64,
    margin: f64,
}

impl Toolbar {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            state: ToolbarState::default(),
            width: config.toolbar_width,
            height: config.toolbar_height,
            margin: config.toolbar_margin,
        }
    }

    pub fn state(&self) -> &ToolbarState {
        &self.state
    }

    /// Show the toolbar above a non-collapsed selection, hide it otherwise
    pub fn update_selection(&mut self, selection: Option<&SelectionInfo>, viewport: Viewport) -> &ToolbarState {
        match selection {
            Some(selection) if !selection.collapsed => {
                self.state = ToolbarState {
                    visible: true,
                    position: Some(self.position_for(&selection.rect, viewport)),
                    active: selection.formats,
                };
            }
            _ => self.hide(),
        }
        &self.state
    }

    pub fn hide(&mut self) {
        self.state.visible = false;
        self.state.position = None;
    }

    /// Centered above the selection, flipped below when there is no room,
    /// and clamped so the whole toolbar stays inside the viewport
    fn position_for(&self, rect: &Rect, viewport: Viewport) -> Point {
        let m = self.margin;
        let mut x = rect.left + rect.width / 2.0 - self.width / 2.0;
        let mut y = rect.top - self.height - m;
        if y < m {
            y = rect.top + rect.height + m;
        }

        let max_x = (viewport.width - self.width - m).max(m);
        let max_y = (viewport.height - self.height - m).max(m);
        x = x.clamp(m, max_x);
        y = y.clamp(m, max_y);
        Point { x, y }
    }

    /// Run a command and update the active state
    pub fn apply(&mut self, command: &FormatCommand) -> Result<Vec<ToolbarAction>, FormatError> {
        let active = &mut self.state.active;
        let actions = match command {
            FormatCommand::Bold => {
                active.bold = !active.bold;
                vec![ToolbarAction::exec("bold")]
            }
            FormatCommand::Italic => {
                active.italic = !active.italic;
                vec![ToolbarAction::exec("italic")]
            }
            FormatCommand::Underline => {
                active.underline = !active.underline;
                vec![ToolbarAction::exec("underline")]
            }
            FormatCommand::Strikethrough => {
                active.strikethrough = !active.strikethrough;
                vec![ToolbarAction::exec("strikeThrough")]
            }
            FormatCommand::Align(alignment) => {
                active.alignment = Some(*alignment);
                vec![ToolbarAction::exec(justify_command(*alignment))]
            }
            FormatCommand::Link(url) => {
                let url = normalize_link(url)?;
                vec![ToolbarAction::exec_with("createLink", url)]
            }
            FormatCommand::ClearFormatting => {
                *active = FormatState {
                    alignment: active.alignment,
                    ..FormatState::default()
                };
                vec![ToolbarAction::exec("removeFormat"), ToolbarAction::exec("unlink")]
            }
        };
        debug!(?command, "Applied formatting command");
        Ok(actions)
    }
}

fn justify_command(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "justifyLeft",
        Alignment::Center => "justifyCenter",
        Alignment::Right => "justifyRight",
        Alignment::Justify => "justifyFull",
    }
}

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];
const KEPT_PREFIXES: &[&str] = &["http://", "https://", "mailto:", "tel:", "/", "#"];

/// Validate and normalize a URL typed into the link command
pub fn normalize_link(raw: &str) -> Result<String, FormatError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(FormatError::EmptyLink);
    }

    let lower: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if BLOCKED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return Err(FormatError::UnsafeLink(url.to_string()));
    }

    if KEPT_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{}", url))
    }
}
