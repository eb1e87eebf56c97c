use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::kind::ArtifactKind;
use crate::schema::{ArtifactSpec, ToolSpec};

pub const HTML_RENDER_TOOL_NAME: &str = "html_render";
pub const DEFAULT_FRAME_TITLE: &str = "HTML content";
pub const DEFAULT_FRAME_HEIGHT: f64 = 400.0;

#[expect(clippy::expect_used)]
static CSS_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,5}(\.\d{1,3})?(px|em|rem|vh|%)$").expect("CSS length pattern is valid")
});

pub struct HtmlRenderSpec;

/// Frame height: a pixel count or a plain CSS length (`px`, `em`, `rem`,
/// `vh`, `%`). Anything else falls back to the default height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FrameHeight {
    Pixels(f64),
    Css(String),
}

impl Default for FrameHeight {
    fn default() -> Self {
        FrameHeight::Pixels(DEFAULT_FRAME_HEIGHT)
    }
}

impl FrameHeight {
    pub fn to_css(&self) -> String {
        match self {
            FrameHeight::Pixels(px) if px.is_finite() => format!("{}px", px.max(0.0).round()),
            FrameHeight::Pixels(_) => FrameHeight::default().to_css(),
            FrameHeight::Css(value) => {
                let value = value.trim();
                if let Ok(px) = value.parse::<f64>() {
                    FrameHeight::Pixels(px).to_css()
                } else if CSS_LENGTH.is_match(value) {
                    value.to_string()
                } else {
                    warn!(target: "tools::sandbox", height = value, "Rejected frame height");
                    FrameHeight::default().to_css()
                }
            }
        }
    }
}

fn default_title() -> String {
    DEFAULT_FRAME_TITLE.to_string()
}

fn default_show_border() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HtmlRenderParams {
    /// HTML to show; scripts run in a sandboxed frame
    pub html: String,
    /// Caption shown above the frame
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_show_border")]
    pub show_border: bool,
    #[serde(default)]
    pub height: FrameHeight,
}

impl ToolSpec for HtmlRenderSpec {
    type Params = HtmlRenderParams;

    const NAME: &'static str = HTML_RENDER_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "HTML preview";
    const DESCRIPTION: &'static str =
        "Show an interactive HTML page (demos, simulations, small games) in a sandboxed frame that tolerates malformed HTML";
    const KIND: ArtifactKind = ArtifactKind::Sandbox;
    const EXAMPLE: &'static str =
        r#"html="<div>Your HTML content here</div>", title="Demo", show_border=True"#;
}

impl ArtifactSpec for HtmlRenderSpec {
    fn source(params: &Self::Params) -> &str {
        &params.html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_params_default() {
        let params: HtmlRenderParams =
            serde_json::from_value(serde_json::json!({ "html": "<p/>" })).unwrap();
        assert_eq!(params.title, DEFAULT_FRAME_TITLE);
        assert!(params.show_border);
        assert_eq!(params.height.to_css(), "400px");

        let params: HtmlRenderParams = serde_json::from_value(serde_json::json!({
            "html": "<p/>",
            "title": "Demo",
            "show_border": false,
            "height": 250.0
        }))
        .unwrap();
        assert_eq!(params.title, "Demo");
        assert!(!params.show_border);
        assert_eq!(params.height.to_css(), "250px");
    }

    #[test]
    fn height_accepts_plain_lengths_only() {
        assert_eq!(FrameHeight::Css("80vh".to_string()).to_css(), "80vh");
        assert_eq!(FrameHeight::Css(" 12.5em ".to_string()).to_css(), "12.5em");
        assert_eq!(FrameHeight::Css("120".to_string()).to_css(), "120px");

        assert_eq!(FrameHeight::Css("100px;position:fixed".to_string()).to_css(), "400px");
        assert_eq!(FrameHeight::Css("calc(100% - 1px)".to_string()).to_css(), "400px");
        assert_eq!(FrameHeight::Css("\"><script>".to_string()).to_css(), "400px");
        assert_eq!(FrameHeight::Pixels(f64::INFINITY).to_css(), "400px");
    }
}
