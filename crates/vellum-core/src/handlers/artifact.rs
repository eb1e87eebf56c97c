use std::marker::PhantomData;

use async_trait::async_trait;
use tracing::debug;
use vellum_tools::tools::{KatexRenderSpec, MermaidRenderSpec, PintoraRenderSpec, TypstRenderSpec};
use vellum_tools::ArtifactSpec;

use super::{ArtifactHandler, DispatchMode, HandlerContext, HandlerOutput};
use crate::placeholder::{
    DEFERRED_MESSAGE, content_panel, error_panel, loading_panel, mark_loaded, new_placeholder_id,
    placeholder_markup,
};
use crate::dom::Markup;
use crate::render::RenderError;

pub const ATTR_SCALE: &str = "data-scale";
const SCALE_RANGE: (f64, f64) = (0.1, 5.0);

/// Applies a display scale to a placeholder; `1`, non-finite and
/// non-positive scales leave it untouched.
pub fn apply_scale(markup: Markup, scale: Option<f64>) -> Markup {
    match scale {
        Some(scale) if scale.is_finite() && scale > 0.0 && (scale - 1.0).abs() > f64::EPSILON => {
            let scale = scale.clamp(SCALE_RANGE.0, SCALE_RANGE.1);
            markup
                .attr(ATTR_SCALE, scale.to_string())
                .attr("style", format!("zoom:{scale}"))
        }
        _ => markup,
    }
}

/// Handler for every tool whose artifact is rendered from one source string
/// by a render engine.
pub struct RenderArtifactHandler<S> {
    _spec: PhantomData<fn() -> S>,
}

impl<S> RenderArtifactHandler<S> {
    pub fn new() -> Self {
        Self { _spec: PhantomData }
    }
}

impl<S> Default for RenderArtifactHandler<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub type MermaidHandler = RenderArtifactHandler<MermaidRenderSpec>;
pub type PintoraHandler = RenderArtifactHandler<PintoraRenderSpec>;
pub type TypstHandler = RenderArtifactHandler<TypstRenderSpec>;
pub type KatexHandler = RenderArtifactHandler<KatexRenderSpec>;

#[async_trait]
impl<S> ArtifactHandler for RenderArtifactHandler<S>
where
    S: ArtifactSpec + 'static,
{
    type Spec = S;

    async fn handle(&self, params: S::Params, ctx: &HandlerContext) -> HandlerOutput {
        let kind = S::KIND;
        let source = S::source(&params);
        let scale = S::scale(&params);
        let id = new_placeholder_id(kind);

        if ctx.mode == DispatchMode::Streaming {
            let body = loading_panel(kind, DEFERRED_MESSAGE);
            return HandlerOutput::markup(apply_scale(
                placeholder_markup(kind, &id, source, body),
                scale,
            ));
        }

        let rendered = match ctx.session.engine(kind) {
            Some(engine) => {
                let backend = engine.backend();
                match backend.ensure_ready() {
                    Ok(()) => backend.render(&id, source).await,
                    Err(err) => Err(err),
                }
            }
            None => Err(RenderError::BackendUnavailable(kind.label().to_string())),
        };

        let markup = match rendered {
            Ok(html) => mark_loaded(
                placeholder_markup(kind, &id, source, content_panel(&html)),
                source,
            ),
            Err(err) => {
                debug!(target: "handlers::artifact", tool = S::NAME, error = %err, "Inline render failed");
                placeholder_markup(kind, &id, source, error_panel(kind, &err, source))
            }
        };
        HandlerOutput::markup(apply_scale(markup, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_tools::ArtifactKind;

    fn placeholder() -> Markup {
        placeholder_markup(ArtifactKind::Chart, "chart-1", "mindmap", Markup::div())
    }

    #[test]
    fn scale_is_clamped_and_recorded() {
        let scaled = apply_scale(placeholder(), Some(2.0));
        assert_eq!(scaled.attribute(ATTR_SCALE), Some("2"));
        assert_eq!(scaled.attribute("style"), Some("zoom:2"));

        let clamped = apply_scale(placeholder(), Some(40.0));
        assert_eq!(clamped.attribute(ATTR_SCALE), Some("5"));
    }

    #[test]
    fn unit_or_invalid_scale_is_ignored() {
        for scale in [None, Some(1.0), Some(0.0), Some(-2.0), Some(f64::NAN)] {
            let markup = apply_scale(placeholder(), scale);
            assert_eq!(markup.attribute(ATTR_SCALE), None);
            assert_eq!(markup.attribute("style"), None);
        }
    }
}
