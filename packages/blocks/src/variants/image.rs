use super::{validate_align, ALIGN_OPTIONS};
use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{options, Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_range, expect_str, to_settings, typed, Alignment, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageSettings {
    pub src: String,
    pub alt: String,
    /// Percentage of the step width
    pub width: u32,
    pub align: Alignment,
    pub link: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            src: String::new(),
            alt: String::new(),
            width: 100,
            align: Alignment::Center,
            link: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct Image;

impl BlockVariant for Image {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn display_name(&self) -> &'static str {
        "Image"
    }

    fn icon(&self) -> &'static str {
        "image"
    }

    fn category(&self) -> Category {
        Category::Media
    }

    fn default_settings(&self) -> Settings {
        to_settings(&ImageSettings::default())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: ImageSettings = typed(&block.settings);
        let wrapper = InlineStyle::new().push("text-align", s.align.as_css());

        let body = if s.src.is_empty() {
            "<div class=\"sc-image-empty\" data-action=\"choose-image\">Choose an image</div>".to_string()
        } else {
            let img = format!(
                "<img src=\"{}\" alt=\"{}\" style=\"width: {}%;\">",
                escape_html(&s.src),
                escape_html(&s.alt),
                s.width
            );
            if s.link.is_empty() {
                img
            } else {
                format!("<a href=\"{}\">{}</a>", escape_html(&s.link), img)
            }
        };

        format!("{}{}{}", open_root(block, &wrapper), body, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "src", "Image", Control::Url)
            .field(settings, "alt", "Alt text", Control::Text)
            .field(settings, "width", "Width (%)", Control::Number { min: 1.0, max: 100.0, step: 1.0 })
            .field(settings, "align", "Alignment", options(ALIGN_OPTIONS))
            .field(settings, "link", "Link", Control::Url)
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "src" | "alt" | "link" => expect_str(key, value).map(|_| ()),
            "width" => expect_range(key, value, 1.0, 100.0).map(|_| ()),
            "align" => validate_align(key, value),
            _ => Ok(()),
        }
    }

    fn needs_configuration(&self, block: &Block) -> bool {
        block.setting_str("src").map_or(true, str::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_image_needs_configuration() {
        let mut block = Block::new("image");
        block.settings = Image.default_settings();
        assert!(Image.needs_configuration(&block));
        assert!(Image.render(&block, &RenderContext::default()).contains("Choose an image"));

        block.set_setting("src", "https://cdn.example.com/a.png");
        assert!(!Image.needs_configuration(&block));
        assert!(Image
            .render(&block, &RenderContext::default())
            .contains("<img src=\"https://cdn.example.com/a.png\""));
    }
}
