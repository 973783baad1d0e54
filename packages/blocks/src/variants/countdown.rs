use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_str, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CountdownSettings {
    /// RFC 3339 instant the timer counts down to
    pub target: String,
    pub expired_text: String,
    pub color: String,
    pub show_days: bool,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            target: String::new(),
            expired_text: "This offer has expired".to_string(),
            color: "#111111".to_string(),
            show_days: true,
        }
    }
}

pub fn parse_target(target: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(target.trim()).ok()
}

#[derive(Debug)]
pub struct Countdown;

impl BlockVariant for Countdown {
    fn kind(&self) -> &'static str {
        "countdown"
    }

    fn display_name(&self) -> &'static str {
        "Countdown"
    }

    fn icon(&self) -> &'static str {
        "timer"
    }

    fn category(&self) -> Category {
        Category::Advanced
    }

    fn default_settings(&self) -> Settings {
        to_settings(&CountdownSettings::default())
    }

    // The ticking itself is done by the host; the markup only carries the target.
    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: CountdownSettings = typed(&block.settings);
        let style = InlineStyle::new().push("color", s.color.clone());

        let body = match parse_target(&s.target) {
            Some(target) => {
                let mut units = Vec::new();
                if s.show_days {
                    units.push("days");
                }
                units.extend(["hours", "minutes", "seconds"]);
                let cells: String = units
                    .iter()
                    .map(|unit| format!("<span class=\"sc-countdown-unit\" data-unit=\"{}\">00</span>", unit))
                    .collect();
                format!(
                    "<div class=\"sc-countdown\" data-target=\"{}\" data-expired-text=\"{}\">{}</div>",
                    target.to_rfc3339(),
                    escape_html(&s.expired_text),
                    cells
                )
            }
            None => "<div class=\"sc-countdown sc-countdown-unset\">Set an end date</div>".to_string(),
        };

        format!("{}{}{}", open_root(block, &style), body, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "target", "Ends at", Control::DateTime)
            .field(settings, "expiredText", "Text after expiry", Control::Text)
            .field(settings, "color", "Color", Control::Color)
            .field(settings, "showDays", "Show days", Control::Toggle)
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "target" => {
                let text = expect_str(key, value)?;
                if text.trim().is_empty() || parse_target(text).is_some() {
                    Ok(())
                } else {
                    Err(BlockError::invalid(key, "expected an RFC 3339 date and time"))
                }
            }
            "expiredText" | "color" => expect_str(key, value).map(|_| ()),
            "showDays" => super::validate_bool(key, value),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_validation() {
        assert!(Countdown.validate_setting("target", &json!("2030-01-01T00:00:00Z")).is_ok());
        assert!(Countdown.validate_setting("target", &json!("")).is_ok());
        assert!(Countdown.validate_setting("target", &json!("next tuesday")).is_err());
    }

    #[test]
    fn test_render_carries_target() {
        let mut block = Block::new("countdown");
        block.settings = Countdown.default_settings();
        block.set_setting("target", "2030-01-01T00:00:00+00:00");
        block.set_setting("showDays", false);

        let html = Countdown.render(&block, &RenderContext::default());
        assert!(html.contains("data-target=\"2030-01-01T00:00:00+00:00\""));
        assert!(!html.contains("data-unit=\"days\""));
        assert!(html.contains("data-unit=\"seconds\""));
    }
}
