use async_trait::async_trait;
use vellum_tools::ArtifactKind;
use vellum_tools::tools::HtmlRenderSpec;
use vellum_tools::tools::sandbox::HtmlRenderParams;

use super::{ArtifactHandler, DispatchMode, HandlerContext, HandlerOutput};
use crate::dom::Markup;
use crate::placeholder::{DEFERRED_MESSAGE, loading_panel, mark_loaded, new_placeholder_id, placeholder_markup};

const KIND: ArtifactKind = ArtifactKind::Sandbox;

/// Embeds model-written HTML in a script-only sandboxed frame.
#[derive(Debug, Default)]
pub struct SandboxHandler;

pub fn sandbox_frame(html: &str, height_css: &str) -> Markup {
    Markup::element("iframe")
        .class("sandbox-frame")
        .attr("sandbox", "allow-scripts")
        .attr("srcdoc", html)
        .attr(
            "style",
            format!("width:100%;height:{height_css};border:none"),
        )
}

/// Titled container around the frame.
pub fn sandbox_panel(params: &HtmlRenderParams) -> Markup {
    let container = Markup::div()
        .class("sandbox-container")
        .child(Markup::div().class("sandbox-title").text(&params.title))
        .child(sandbox_frame(&params.html, &params.height.to_css()));
    if params.show_border {
        container.class("sandbox-bordered")
    } else {
        container
    }
}

#[async_trait]
impl ArtifactHandler for SandboxHandler {
    type Spec = HtmlRenderSpec;

    async fn handle(&self, params: HtmlRenderParams, ctx: &HandlerContext) -> HandlerOutput {
        let id = new_placeholder_id(KIND);
        let markup = match ctx.mode {
            DispatchMode::Streaming => placeholder_markup(
                KIND,
                &id,
                &params.html,
                loading_panel(KIND, DEFERRED_MESSAGE),
            ),
            DispatchMode::Settled => mark_loaded(
                placeholder_markup(
                    KIND,
                    &id,
                    &params.html,
                    sandbox_panel(&params),
                ),
                &params.html,
            ),
        };
        HandlerOutput::markup(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_sandboxed() {
        let html = sandbox_frame("<script>alert(1)</script>", "300px").to_html();
        assert!(html.starts_with("<iframe"));
        assert!(html.contains(r#"sandbox="allow-scripts""#));
        assert!(html.contains("srcdoc=\"&lt;script&gt;alert(1)&lt;/script&gt;\""));
        assert!(html.contains("height:300px"));
    }

    #[test]
    fn panel_carries_title_and_border() {
        let params: HtmlRenderParams = serde_json::from_value(serde_json::json!({
            "html": "<p>hi</p>",
            "title": "<Demo>",
            "height": "100px;position:fixed"
        }))
        .unwrap();
        let panel = sandbox_panel(&params);
        assert!(panel.has_class("sandbox-bordered"));
        assert_eq!(panel.children[0].html, "&lt;Demo&gt;");
        assert_eq!(
            panel.children[1].attribute("style"),
            Some("width:100%;height:400px;border:none")
        );

        let params = HtmlRenderParams {
            show_border: false,
            ..params
        };
        assert!(!sandbox_panel(&params).has_class("sandbox-bordered"));
    }
}
