//! Legacy import adapter.
//!
//! Older documents were saved without structured settings; their styling only
//! exists as an inline `style` attribute captured from the rendered markup.
//! This is the one place that reads settings back out of markup. Everything
//! else treats settings as the source of truth.

use crate::block::Block;
use crate::settings::{Alignment, Settings};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z-]+)\s*:\s*([^;]+)").expect("valid declaration pattern"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?)\s*(px|%)?$").expect("valid number pattern"));

#[derive(Debug, Clone, Copy)]
enum Conversion {
    Number,
    Text,
    Align,
}

const MAPPING: &[(&str, &str, Conversion)] = &[
    ("font-size", "fontSize", Conversion::Number),
    ("color", "color", Conversion::Text),
    ("text-align", "align", Conversion::Align),
    ("line-height", "lineHeight", Conversion::Number),
    ("background-color", "backgroundColor", Conversion::Text),
    ("background", "backgroundColor", Conversion::Text),
    ("border-radius", "borderRadius", Conversion::Number),
    ("height", "height", Conversion::Number),
    ("width", "width", Conversion::Number),
];

/// Split an inline style string into `(property, value)` pairs
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    DECLARATION
        .captures_iter(style)
        .map(|caps| (caps[1].trim().to_ascii_lowercase(), caps[2].trim().to_string()))
        .collect()
}

fn convert(value: &str, conversion: Conversion) -> Option<Value> {
    match conversion {
        Conversion::Text => Some(Value::from(value)),
        Conversion::Align => Alignment::parse(value).map(|a| Value::from(a.as_css())),
        Conversion::Number => {
            let caps = NUMBER.captures(value)?;
            let number: f64 = caps[1].parse().ok()?;
            if number.fract() == 0.0 {
                Some(Value::from(number as i64))
            } else {
                Some(Value::from(number))
            }
        }
    }
}

/// Derive settings from a block's legacy `style` attribute.
///
/// Only settings the variant knows (present in `defaults`) are extracted;
/// declarations that do not map stay in the `style` attribute.
pub fn import(mut block: Block, defaults: &Settings) -> Block {
    let Some(style) = block.attribute_str("style").map(str::to_string) else {
        return block;
    };

    let mut leftover = Vec::new();
    for (property, value) in parse_style(&style) {
        let mapped = MAPPING
            .iter()
            .find(|(css, key, _)| *css == property && defaults.contains_key(*key))
            .and_then(|(_, key, conversion)| convert(&value, *conversion).map(|v| (*key, v)));

        match mapped {
            Some((key, converted)) => {
                block.settings.insert(key.to_string(), converted);
            }
            None => leftover.push(format!("{}: {};", property, value)),
        }
    }

    debug!(
        block_id = %block.id,
        imported = block.settings.len(),
        kept = leftover.len(),
        "Imported legacy inline style"
    );

    if leftover.is_empty() {
        block.attributes.remove("style");
    } else {
        block.attributes.insert("style".to_string(), Value::from(leftover.join(" ")));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::to_settings;
    use serde_json::json;

    #[test]
    fn test_parse_style() {
        let parsed = parse_style("font-size: 22px; Color:red;margin : 4px 0");
        assert_eq!(
            parsed,
            vec![
                ("font-size".to_string(), "22px".to_string()),
                ("color".to_string(), "red".to_string()),
                ("margin".to_string(), "4px 0".to_string()),
            ]
        );
    }

    #[test]
    fn test_import_maps_known_settings() {
        let defaults = to_settings(&json!({"fontSize": 16, "color": "#333", "align": "left"}));
        let block = Block::new("text").with_attribute("style", "font-size: 22px; color: red; margin: 4px; text-align: center");

        let imported = import(block, &defaults);
        assert_eq!(imported.settings["fontSize"], json!(22));
        assert_eq!(imported.settings["color"], json!("red"));
        assert_eq!(imported.settings["align"], json!("center"));
        assert_eq!(imported.attribute_str("style"), Some("margin: 4px;"));
    }

    #[test]
    fn test_import_ignores_settings_variant_lacks() {
        let defaults = to_settings(&json!({"height": 24}));
        let block = Block::new("spacer").with_attribute("style", "height: 40px; color: blue");

        let imported = import(block, &defaults);
        assert_eq!(imported.settings["height"], json!(40));
        assert!(!imported.settings.contains_key("color"));
        assert_eq!(imported.attribute_str("style"), Some("color: blue;"));
    }
}
