use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, warn};
use vellum_tools::tools::WolframAlphaComputeSpec;
use vellum_tools::tools::compute::WolframAlphaComputeParams;
use vellum_tools::{ArtifactKind, ToolSpec};

use super::{ArtifactHandler, DispatchMode, HandlerContext, HandlerOutput};
use crate::backends::format::{RELATED_QUERY_CLASS, format_results};
use crate::backends::{ComputeFormat, ComputeResult};
use crate::dom::Markup;
use crate::placeholder::{
    ATTR_PAYLOAD, CLASS_BODY, DEFERRED_MESSAGE, content_panel, error_panel, loading_panel,
    new_placeholder_id, placeholder_markup,
};
use crate::render::RenderError;
use crate::session::SessionContext;

const KIND: ArtifactKind = ArtifactKind::Compute;

/// Issues the query without blocking dispatch; the result replaces the
/// placeholder's body when it arrives.
#[derive(Debug, Default)]
pub struct ComputeHandler;

fn result_markup(results: &[ComputeResult], format: ComputeFormat) -> Vec<Markup> {
    let related: Vec<String> = results
        .iter()
        .flat_map(|r| r.related_queries.iter().cloned())
        .collect();
    let pods: Vec<ComputeResult> = results
        .iter()
        .filter(|r| r.title.is_some() || r.plaintext.is_some() || r.img_base64.is_some())
        .map(|r| ComputeResult {
            related_queries: Vec::new(),
            ..r.clone()
        })
        .collect();

    let formatted = format_results(&pods, format);
    let body = match format {
        ComputeFormat::Html => content_panel(&formatted),
        ComputeFormat::Markdown | ComputeFormat::Raw => Markup::element("pre")
            .class("compute-text")
            .text(&formatted),
    };
    let mut markup = vec![body];
    if !related.is_empty() {
        markup.push(
            Markup::element("ul")
                .class("compute-related-queries")
                .children(related.iter().map(|query| {
                    Markup::element("li")
                        .class(RELATED_QUERY_CLASS)
                        .attr("data-query", query.as_str())
                        .text(query)
                })),
        );
    }
    markup
}

/// Fills in the placeholder `id` if it is still in the document.
fn settle(
    session: &SessionContext,
    id: &str,
    query: &str,
    format: Option<ComputeFormat>,
    outcome: Result<Vec<ComputeResult>, RenderError>,
) {
    let doc = session.document();
    let Some(node) = doc.find_by_dom_id(id) else {
        debug!(target: "handlers::compute", %id, "Placeholder gone before the result arrived");
        return;
    };
    let Some(body) = doc.first_class(node, CLASS_BODY) else {
        return;
    };

    match outcome {
        Ok(results) => {
            let format = format.unwrap_or(session.preferences().compute.format);
            doc.replace_children(body, &result_markup(&results, format));
            let payload = doc.attribute(node, ATTR_PAYLOAD).unwrap_or_default();
            session.states().mark_loaded(doc, id, node, &payload);
        }
        Err(err) => {
            warn!(target: "handlers::compute", %id, error = %err, "Compute query failed");
            doc.replace_children(body, &[error_panel(KIND, &err, query)]);
            session.states().mark_failed(doc, id, node);
        }
    }
}

/// Format named by the call; unknown names fall back to the configured one.
fn requested_format(name: Option<&str>) -> Option<ComputeFormat> {
    let name = name?.trim();
    match ComputeFormat::from_str(&name.to_ascii_lowercase()) {
        Ok(format) => Some(format),
        Err(_) => {
            warn!(target: "handlers::compute", format = name, "Unknown compute format");
            None
        }
    }
}

async fn run_query(
    session: Arc<SessionContext>,
    id: String,
    query: String,
    image_only: bool,
    format: Option<ComputeFormat>,
) {
    let key = SessionContext::compute_cache_key(&query, image_only);
    let outcome = if let Some(cached) = session.cached_compute(&key) {
        debug!(target: "handlers::compute", %key, "Compute cache hit");
        Ok(cached)
    } else {
        match session.backends().compute.clone() {
            Some(backend) => match backend.compute(&query, image_only).await {
                Ok(results) => {
                    session.cache_compute(key, results.clone());
                    Ok(results)
                }
                Err(err) => Err(RenderError::from(err)),
            },
            None => Err(RenderError::BackendUnavailable(KIND.label().to_string())),
        }
    };
    settle(&session, &id, &query, format, outcome);
}

#[async_trait]
impl ArtifactHandler for ComputeHandler {
    type Spec = WolframAlphaComputeSpec;

    async fn handle(
        &self,
        params: WolframAlphaComputeParams,
        ctx: &HandlerContext,
    ) -> HandlerOutput {
        let id = new_placeholder_id(KIND);

        if ctx.mode == DispatchMode::Streaming {
            let body = loading_panel(KIND, DEFERRED_MESSAGE);
            return HandlerOutput::markup(placeholder_markup(KIND, &id, &params.query, body));
        }

        debug!(target: "handlers::compute", tool = WolframAlphaComputeSpec::NAME, %id, "Dispatching compute query");
        let body = loading_panel(KIND, "computing");
        let markup = placeholder_markup(KIND, &id, &params.query, body);
        let format = requested_format(params.format.as_deref());
        let task = run_query(
            ctx.session.clone(),
            id,
            params.query,
            params.image_only,
            format,
        )
        .boxed();
        HandlerOutput::markup(markup).with_task(task)
    }
}
