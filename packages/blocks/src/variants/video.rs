use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::settings::{expect_str, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, RenderContext};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static YOUTUBE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/)([A-Za-z0-9_-]{6,})")
        .expect("valid youtube pattern")
});
static VIMEO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com/(?:video/)?(\d+)").expect("valid vimeo pattern"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoSettings {
    pub url: String,
    pub autoplay: bool,
    pub muted: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            autoplay: false,
            muted: true,
        }
    }
}

/// Provider embed URL for a pasted video link
pub fn embed_url(url: &str) -> Option<String> {
    if let Some(caps) = YOUTUBE.captures(url) {
        return Some(format!("https://www.youtube.com/embed/{}", &caps[1]));
    }
    if let Some(caps) = VIMEO.captures(url) {
        return Some(format!("https://player.vimeo.com/video/{}", &caps[1]));
    }
    None
}

#[derive(Debug)]
pub struct Video;

impl BlockVariant for Video {
    fn kind(&self) -> &'static str {
        "video"
    }

    fn display_name(&self) -> &'static str {
        "Video"
    }

    fn icon(&self) -> &'static str {
        "video"
    }

    fn category(&self) -> Category {
        Category::Media
    }

    fn default_settings(&self) -> Settings {
        to_settings(&VideoSettings::default())
    }

    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        let s: VideoSettings = typed(&block.settings);

        let body = if s.url.is_empty() {
            "<div class=\"sc-video-empty\">Paste a video link</div>".to_string()
        } else if let Some(embed) = embed_url(&s.url) {
            let mut src = embed;
            let mut params = Vec::new();
            if s.autoplay {
                params.push("autoplay=1");
            }
            if s.muted {
                params.push("mute=1");
            }
            if !params.is_empty() {
                src.push('?');
                src.push_str(&params.join("&"));
            }
            format!(
                "<iframe src=\"{}\" frameborder=\"0\" allowfullscreen></iframe>",
                escape_html(&src)
            )
        } else {
            format!(
                "<video src=\"{}\" controls{}{}></video>",
                escape_html(&s.url),
                if s.autoplay { " autoplay" } else { "" },
                if s.muted { " muted" } else { "" }
            )
        };

        format!("{}{}{}", open_root(block, &InlineStyle::new()), body, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "url", "Video URL", Control::Url)
            .field(settings, "autoplay", "Autoplay", Control::Toggle)
            .field(settings, "muted", "Muted", Control::Toggle)
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "url" => expect_str(key, value).map(|_| ()),
            "autoplay" | "muted" => super::validate_bool(key, value),
            _ => Ok(()),
        }
    }

    fn needs_configuration(&self, block: &Block) -> bool {
        block.setting_str("url").map_or(true, str::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_urls() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert_eq!(
            embed_url("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert_eq!(
            embed_url("https://vimeo.com/123456").as_deref(),
            Some("https://player.vimeo.com/video/123456")
        );
        assert_eq!(embed_url("https://cdn.example.com/clip.mp4"), None);
    }

    #[test]
    fn test_render_plain_file() {
        let mut block = Block::new("video");
        block.settings = Video.default_settings();
        block.set_setting("url", "https://cdn.example.com/clip.mp4");

        let html = Video.render(&block, &RenderContext::default());
        assert!(html.contains("<video src=\"https://cdn.example.com/clip.mp4\" controls muted></video>"));
    }
}
