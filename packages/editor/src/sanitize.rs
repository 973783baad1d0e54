//! Clipboard sanitization.
//!
//! Pasted content is always reduced to plain text; clipboard markup is never
//! inserted as-is.

use serde::Serialize;
use stepcraft_blocks::markup::{escape_html, plain_text};

/// Sanitized paste, as plain text and as safe markup ready for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasteContent {
    pub text: String,
    pub markup: String,
}

impl PasteContent {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Sanitize clipboard data. `html` is the `text/html` flavor if the
/// clipboard offered one; `text` the `text/plain` flavor.
pub fn sanitize_paste(html: Option<&str>, text: Option<&str>) -> PasteContent {
    let raw = match (html, text) {
        (Some(html), _) if !html.trim().is_empty() => plain_text(html),
        (_, Some(text)) => text.replace("\r\n", "\n"),
        _ => String::new(),
    };

    let lines: Vec<String> = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    // Drop leading and trailing blank lines, collapse runs of blank lines
    let mut kept: Vec<String> = Vec::new();
    for line in lines {
        if line.is_empty() && kept.last().map_or(true, String::is_empty) {
            continue;
        }
        kept.push(line);
    }
    while kept.last().is_some_and(String::is_empty) {
        kept.pop();
    }

    let text = kept.join("\n");
    let markup = kept.iter().map(|l| escape_html(l)).collect::<Vec<_>>().join("<br>");
    PasteContent { text, markup }
}
