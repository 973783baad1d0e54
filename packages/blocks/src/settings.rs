//! Settings helpers shared by every variant.
//!
//! Settings are stored untyped (a JSON object) so that unknown keys survive a
//! load/save cycle. Variants read them through typed structs that carry
//! `#[serde(default)]`, which is what makes older documents load against
//! newer defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub type Settings = serde_json::Map<String, Value>;

/// Horizontal alignment used by text-bearing and media variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Overlay saved settings on top of variant defaults.
///
/// Keys present in `saved` win; keys only present in `defaults` are kept.
/// Keys unknown to the variant are kept as well.
pub fn merge_defaults(defaults: Settings, saved: &Settings) -> Settings {
    let mut merged = defaults;
    for (key, value) in saved {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Convert a typed settings struct into the stored representation
pub fn to_settings<T: Serialize>(value: &T) -> Settings {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Settings::new(),
    }
}

/// Read stored settings through a typed view.
///
/// A malformed value only costs its own key: it falls back to that field's
/// default while every other saved setting is kept.
pub fn typed<T: DeserializeOwned + Serialize + Default>(settings: &Settings) -> T {
    if let Ok(parsed) = serde_json::from_value(Value::Object(settings.clone())) {
        return parsed;
    }

    let mut accepted = to_settings(&T::default());
    for (key, value) in settings {
        let previous = accepted.insert(key.clone(), value.clone());
        if serde_json::from_value::<T>(Value::Object(accepted.clone())).is_err() {
            warn!(key = %key, value = %value, "Setting did not match the variant schema - using its default");
            match previous {
                Some(default) => accepted.insert(key.clone(), default),
                None => accepted.remove(key),
            };
        }
    }
    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

/// Deserialize a value, substituting the default when it is malformed.
///
/// Used on enum-valued fields so a value written by a newer editor does not
/// make the whole document unreadable.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

pub fn get_str<'a>(settings: &'a Settings, key: &str) -> Option<&'a str> {
    settings.get(key).and_then(Value::as_str)
}

pub fn get_bool(settings: &Settings, key: &str) -> Option<bool> {
    settings.get(key).and_then(Value::as_bool)
}

pub fn get_f64(settings: &Settings, key: &str) -> Option<f64> {
    settings.get(key).and_then(Value::as_f64)
}

/// Require a string setting, used by variant validators
pub fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, crate::BlockError> {
    value
        .as_str()
        .ok_or_else(|| crate::BlockError::invalid(key, "expected a string"))
}

/// Require a number within `[min, max]`
pub fn expect_range(key: &str, value: &Value, min: f64, max: f64) -> Result<f64, crate::BlockError> {
    let number = value
        .as_f64()
        .ok_or_else(|| crate::BlockError::invalid(key, "expected a number"))?;
    if number < min || number > max {
        return Err(crate::BlockError::invalid(
            key,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(default, rename_all = "camelCase")]
    struct Sample {
        font_size: u32,
        align: Alignment,
    }

    #[test]
    fn test_merge_keeps_new_defaults() {
        let defaults = to_settings(&json!({"fontSize": 16, "color": "#333333", "lineHeight": 1.5}));
        let saved = to_settings(&json!({"fontSize": 22, "legacyKey": true}));

        let merged = merge_defaults(defaults, &saved);
        assert_eq!(merged["fontSize"], json!(22));
        assert_eq!(merged["color"], json!("#333333"));
        assert_eq!(merged["lineHeight"], json!(1.5));
        assert_eq!(merged["legacyKey"], json!(true));
    }

    #[test]
    fn test_typed_view_falls_back_per_key() {
        let settings = to_settings(&json!({"fontSize": "huge"}));
        let sample: Sample = typed(&settings);
        assert_eq!(sample, Sample::default());

        let settings = to_settings(&json!({"fontSize": "18px", "align": "center"}));
        let sample: Sample = typed(&settings);
        assert_eq!(sample.font_size, 0);
        assert_eq!(sample.align, Alignment::Center);

        let settings = to_settings(&json!({"fontSize": 20, "align": "center"}));
        let sample: Sample = typed(&settings);
        assert_eq!(sample.font_size, 20);
        assert_eq!(sample.align, Alignment::Center);
    }

    #[test]
    fn test_lenient_field() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "lenient", default)]
            align: Alignment,
        }

        let holder: Holder = serde_json::from_value(json!({"align": "diagonal"})).unwrap();
        assert_eq!(holder.align, Alignment::Left);
    }

    #[test]
    fn test_expect_range() {
        assert!(expect_range("level", &json!(3), 1.0, 6.0).is_ok());
        assert!(expect_range("level", &json!(9), 1.0, 6.0).is_err());
        assert!(expect_range("level", &json!("x"), 1.0, 6.0).is_err());
    }
}
