use super::{validate_action, Action};
use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{options, Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_str, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YesNoSettings {
    pub yes_label: String,
    pub no_label: String,
    pub yes_action: Action,
    pub no_action: Action,
}

impl Default for YesNoSettings {
    fn default() -> Self {
        Self {
            yes_label: "Yes please!".to_string(),
            no_label: "No thanks".to_string(),
            yes_action: Action::NextStep,
            no_action: Action::Close,
        }
    }
}

#[derive(Debug)]
pub struct YesNo;

impl BlockVariant for YesNo {
    fn kind(&self) -> &'static str {
        "yes-no"
    }

    fn display_name(&self) -> &'static str {
        "Yes / No"
    }

    fn icon(&self) -> &'static str {
        "split"
    }

    fn category(&self) -> Category {
        Category::Advanced
    }

    fn default_settings(&self) -> Settings {
        to_settings(&YesNoSettings::default())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: YesNoSettings = typed(&block.settings);
        let buttons = format!(
            "<div class=\"sc-yes-no\"><button type=\"button\" class=\"sc-yes\" data-action=\"{}\">{}</button><button type=\"button\" class=\"sc-no\" data-action=\"{}\">{}</button></div>",
            s.yes_action.as_str(),
            escape_html(&s.yes_label),
            s.no_action.as_str(),
            escape_html(&s.no_label)
        );
        format!("{}{}{}", open_root(block, &InlineStyle::new()), buttons, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "yesLabel", "Yes label", Control::Text)
            .field(settings, "yesAction", "Yes does", options(Action::OPTIONS))
            .field(settings, "noLabel", "No label", Control::Text)
            .field(settings, "noAction", "No does", options(Action::OPTIONS))
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "yesLabel" | "noLabel" => expect_str(key, value).map(|_| ()),
            "yesAction" | "noAction" => validate_action(key, value),
            _ => Ok(()),
        }
    }
}
