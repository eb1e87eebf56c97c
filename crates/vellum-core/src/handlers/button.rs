use async_trait::async_trait;
use vellum_tools::tools::InteractiveButtonSpec;
use vellum_tools::tools::button::InteractiveButtonParams;

use super::{ArtifactHandler, HandlerContext, HandlerOutput};
use crate::dom::Markup;
use crate::session::SEND_BUTTON_CLASS;

/// Quick-reply button labelled `message` that sends `command`. Clicks are picked up by the session's delegated
/// listener, so the button carries no listener of its own.
#[derive(Debug, Default)]
pub struct ButtonHandler;

#[async_trait]
impl ArtifactHandler for ButtonHandler {
    type Spec = InteractiveButtonSpec;

    async fn handle(&self, params: InteractiveButtonParams, ctx: &HandlerContext) -> HandlerOutput {
        ctx.session.ensure_global_listener();
        HandlerOutput::markup(
            Markup::element("button")
                .class(SEND_BUTTON_CLASS)
                .attr("type", "button")
                .attr("data-message", params.command)
                .text(&params.message),
        )
    }
}
