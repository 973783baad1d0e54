//! Markup helpers used by variant renderers.

use crate::block::Block;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));
static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid script pattern")
});
static BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6])\s*>").expect("valid break pattern"));

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decode the entities browsers commonly emit into clipboard and editable markup
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Visible text of a markup fragment, with block-level breaks turned into newlines
pub fn plain_text(markup: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(markup, "");
    let with_breaks = BREAK.replace_all(&without_code, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

/// Ordered CSS declarations for an element's `style` attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, replacing an earlier one for the same property
    pub fn push(mut self, property: &str, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.declarations.iter_mut().find(|(p, _)| p == property) {
            existing.1 = value;
        } else {
            self.declarations.push((property.to_string(), value));
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn declarations(&self) -> &[(String, String)] {
        &self.declarations
    }

    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{}: {};", p, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Opening tag of a block's root element.
///
/// Classes and styles carried in the block's attributes are appended after the
/// variant's own so DOM-sourced overrides keep winning.
pub fn open_root(block: &Block, style: &InlineStyle) -> String {
    let mut classes = format!("sc-block sc-block-{}", escape_html(&block.kind));
    if let Some(extra) = block.attribute_str("class") {
        classes.push(' ');
        classes.push_str(&escape_html(extra));
    }

    let mut css = style.to_css();
    if let Some(extra) = block.attribute_str("style") {
        if !css.is_empty() {
            css.push(' ');
        }
        css.push_str(extra);
    }

    let mut tag = format!(
        "<div class=\"{}\" data-block-id=\"{}\" data-block-type=\"{}\"",
        classes,
        escape_html(block.id.as_str()),
        escape_html(&block.kind)
    );
    if !css.is_empty() {
        tag.push_str(&format!(" style=\"{}\"", escape_html(&css)));
    }
    tag.push('>');
    tag
}

pub fn close_root() -> &'static str {
    "</div>"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockId;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_plain_text_drops_tags_and_scripts() {
        let markup = "<p>Hello&nbsp;<b>there</b></p><script>alert(1)</script><p>again</p>";
        assert_eq!(plain_text(markup), "Hello there\nagain\n");
    }

    #[test]
    fn test_inline_style_replaces_property() {
        let style = InlineStyle::new()
            .push("color", "red")
            .push("font-size", "12px")
            .push("color", "blue");
        assert_eq!(style.to_css(), "color: blue; font-size: 12px;");
        assert_eq!(style.get("color"), Some("blue"));
    }

    #[test]
    fn test_open_root_appends_attribute_overrides() {
        let mut block = Block::new("text").with_attribute("class", "legacy-red");
        block.id = BlockId::from("b1");
        block.attributes.insert("style".into(), "margin: 4px;".into());

        let tag = open_root(&block, &InlineStyle::new().push("color", "red"));
        assert_eq!(
            tag,
            "<div class=\"sc-block sc-block-text legacy-red\" data-block-id=\"b1\" data-block-type=\"text\" style=\"color: red; margin: 4px;\">"
        );
    }
}
