//! Built-in block variants.

mod button;
mod countdown;
mod divider;
mod form;
mod heading;
mod image;
mod input;
mod passthrough;
mod spacer;
mod text;
mod video;
mod yes_no;

pub use button::{Button, ButtonSettings};
pub use countdown::{Countdown, CountdownSettings};
pub use divider::{Divider, DividerSettings};
pub use form::{Form, FormSettings};
pub use heading::{Heading, HeadingSettings};
pub use image::{Image, ImageSettings};
pub use input::{Input, InputSettings};
pub use passthrough::PassThrough;
pub use spacer::{Spacer, SpacerSettings};
pub use text::{Text, TextSettings};
pub use video::{Video, VideoSettings};
pub use yes_no::{YesNo, YesNoSettings};

use crate::errors::BlockError;
use crate::markup::{escape_html, InlineStyle};
use crate::settings::Alignment;
use crate::variant::BlockVariant;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every variant shipped with the editor
pub fn builtins() -> Vec<Box<dyn BlockVariant>> {
    vec![
        Box::new(Text),
        Box::new(Heading),
        Box::new(Button),
        Box::new(Image),
        Box::new(Video),
        Box::new(Divider),
        Box::new(Spacer),
        Box::new(Countdown),
        Box::new(Form),
        Box::new(Input),
        Box::new(YesNo),
    ]
}

/// What a clickable block does in the live popup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    #[default]
    NextStep,
    PreviousStep,
    Close,
    Url,
    Submit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::NextStep => "next-step",
            Action::PreviousStep => "previous-step",
            Action::Close => "close",
            Action::Url => "url",
            Action::Submit => "submit",
        }
    }

    pub(crate) const OPTIONS: &'static [(&'static str, &'static str)] = &[
        ("next-step", "Go to next step"),
        ("previous-step", "Go to previous step"),
        ("close", "Close"),
        ("url", "Open URL"),
        ("submit", "Submit"),
    ];
}

pub(crate) const ALIGN_OPTIONS: &[(&str, &str)] = &[
    ("left", "Left"),
    ("center", "Center"),
    ("right", "Right"),
    ("justify", "Justify"),
];

/// Contenteditable region shared by the text-bearing variants.
///
/// The variant's inline style goes on the region itself so toolbar edits and
/// panel settings act on the same element.
pub(crate) fn editable(tag: &str, extra_class: &str, content: &str, placeholder: &str, style: &InlineStyle) -> String {
    let empty = crate::markup::plain_text(content).trim().is_empty();
    let mut class = String::from("sc-editable");
    if !extra_class.is_empty() {
        class.push(' ');
        class.push_str(extra_class);
    }
    if empty {
        class.push_str(" is-empty");
    }

    let style_attr = if style.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", escape_html(&style.to_css()))
    };

    format!(
        "<{tag} class=\"{class}\"{style_attr} contenteditable=\"true\" data-placeholder=\"{placeholder}\">{content}</{tag}>",
        tag = tag,
        class = class,
        style_attr = style_attr,
        placeholder = escape_html(placeholder),
        content = content,
    )
}

pub(crate) fn validate_align(key: &str, value: &Value) -> Result<(), BlockError> {
    let text = crate::settings::expect_str(key, value)?;
    Alignment::parse(text)
        .map(|_| ())
        .ok_or_else(|| BlockError::invalid(key, format!("unknown alignment '{}'", text)))
}

pub(crate) fn validate_action(key: &str, value: &Value) -> Result<(), BlockError> {
    serde_json::from_value::<Action>(value.clone())
        .map(|_| ())
        .map_err(|_| BlockError::invalid(key, "unknown action"))
}

pub(crate) fn validate_bool(key: &str, value: &Value) -> Result<(), BlockError> {
    value
        .as_bool()
        .map(|_| ())
        .ok_or_else(|| BlockError::invalid(key, "expected true or false"))
}
