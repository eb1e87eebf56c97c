use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::runtime::Handle;
use tracing::{Instrument, debug, info_span, warn};
use vellum_tools::ArtifactKind;

use super::{ArtifactBackend, RenderError, SweepReport, interaction};
use crate::dom::{Document, NodeId};
use crate::events::{EventSink, Severity};
use crate::placeholder::{
    ATTR_ID, ATTR_KIND, ATTR_PAYLOAD, CLASS_BODY, PlaceholderState, StateTable, content_panel,
    decode_payload, error_panel,
};
use crate::render::RetryScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

enum Outcome {
    Rendered,
    Failed(String),
    Gone,
}

/// Renders every placeholder of one artifact kind.
pub struct RenderEngine {
    backend: Arc<dyn ArtifactBackend>,
    doc: Document,
    states: Arc<StateTable>,
    scheduler: RetryScheduler,
    events: EventSink,
    settings: EngineSettings,
    runtime: Option<Handle>,
}

impl RenderEngine {
    pub fn new(
        backend: Arc<dyn ArtifactBackend>,
        doc: Document,
        states: Arc<StateTable>,
        scheduler: RetryScheduler,
        events: EventSink,
        settings: EngineSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            doc,
            states,
            scheduler,
            events,
            settings,
            runtime: Handle::try_current().ok(),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &Arc<dyn ArtifactBackend> {
        &self.backend
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn states(&self) -> &StateTable {
        &self.states
    }

    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// Placeholders of this kind under `container`, with their ids.
    pub fn placeholders(&self, container: NodeId) -> Vec<(NodeId, String)> {
        let kind = self.kind().as_str();
        self.doc
            .query(container, |el| {
                el.attribute(ATTR_KIND) == Some(kind) && el.attribute(ATTR_ID).is_some()
            })
            .into_iter()
            .filter_map(|node| self.doc.attribute(node, ATTR_ID).map(|id| (node, id)))
            .collect()
    }

    /// Runs from a synchronous context such as a click listener.
    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current().ok().or_else(|| self.runtime.clone()) {
            Some(handle) => {
                handle.spawn(future);
            }
            None => warn!(target: "render", kind = %self.kind(), "No runtime to spawn on"),
        }
    }

    /// One sweep over `container`. Failures schedule a retry of the whole
    /// sweep; exhausted or clean sweeps end by binding interactions.
    pub fn render_all(
        self: Arc<Self>,
        container: NodeId,
        retry_count: u32,
        max_retries: u32,
    ) -> BoxFuture<'static, SweepReport> {
        let span = info_span!("render_all", kind = %self.kind(), %container, retry_count, max_retries);
        async move {
            let mut report = SweepReport::new(self.kind(), retry_count);
            self.states.prune(&self.doc);
            let doc = self.doc.clone();
            self.scheduler.retain(|id| doc.find_by_dom_id(id).is_some());

            let pending: Vec<(NodeId, String)> = self
                .placeholders(container)
                .into_iter()
                .filter(|(node, id)| {
                    self.states.state(&self.doc, id, *node) != PlaceholderState::Loaded
                })
                .collect();

            if let Err(err) = self.backend.ensure_ready() {
                warn!(target: "render", kind = %self.kind(), error = %err, "Backend not ready");
                let ids: Vec<String> = pending.iter().map(|(_, id)| id.clone()).collect();
                report.container_error = Some(err.clone());
                if !ids.is_empty() && retry_count < max_retries {
                    self.schedule_retry(&ids, container, retry_count + 1, max_retries);
                    report.retry_scheduled = true;
                } else {
                    for (node, id) in &pending {
                        if self.states.state(&self.doc, id, *node) == PlaceholderState::Loading {
                            continue;
                        }
                        let source = self.source_of(*node);
                        self.write_error(*node, id, &err, &source);
                    }
                    report.failed = ids;
                    self.finish(container, &report);
                }
                return report;
            }

            let mut jobs = Vec::new();
            for (node, id) in pending {
                let payload = self.doc.attribute(node, ATTR_PAYLOAD).unwrap_or_default();
                if self.states.last_rendered(&self.doc, &id, node).as_deref() == Some(payload.as_str()) {
                    self.states.restore_loaded(&self.doc, &id, node);
                    report.skipped += 1;
                    continue;
                }
                if !self.states.try_begin(&self.doc, &id, node) {
                    report.in_flight += 1;
                    continue;
                }
                jobs.push(self.render_one(node, id, payload));
            }

            for outcome in join_all(jobs).await {
                match outcome {
                    Outcome::Rendered => report.rendered += 1,
                    Outcome::Failed(id) => report.failed.push(id),
                    Outcome::Gone => {}
                }
            }

            if !report.failed.is_empty() && retry_count < max_retries {
                self.schedule_retry(&report.failed, container, retry_count + 1, max_retries);
                report.retry_scheduled = true;
            } else {
                self.finish(container, &report);
            }
            debug!(
                target: "render",
                rendered = report.rendered,
                skipped = report.skipped,
                failed = report.failed.len(),
                retry = report.retry_scheduled,
                "Sweep finished"
            );
            report
        }
        .instrument(span)
        .boxed()
    }

    /// Clears the rendered state of one placeholder and sweeps `container`
    /// again with a fresh retry budget.
    pub fn refresh(
        self: Arc<Self>,
        container: NodeId,
        dom_id: String,
    ) -> BoxFuture<'static, SweepReport> {
        self.scheduler.cancel(&dom_id);
        if let Some(node) = self.doc.find_by_dom_id(&dom_id) {
            self.states.reset(&self.doc, &dom_id, node);
        }
        let max_retries = self.settings.max_retries;
        self.render_all(container, 0, max_retries)
    }

    pub fn bind_interactions(self: &Arc<Self>, container: NodeId) {
        interaction::bind_interactions(self, container);
    }

    async fn render_one(&self, node: NodeId, id: String, payload: String) -> Outcome {
        let rendered = match decode_payload(&payload) {
            Ok(source) => self.backend.render(&id, &source).await.map_err(|e| (e, source)),
            Err(e) => Err((e, payload.clone())),
        };

        if !self.doc.contains(node) {
            debug!(target: "render", %id, "Placeholder left the document while rendering");
            self.states.forget(&id);
            return Outcome::Gone;
        }

        match rendered {
            Ok(markup) => {
                if let Some(body) = self.doc.first_class(node, CLASS_BODY) {
                    self.doc.replace_children(body, &[content_panel(&markup)]);
                }
                self.states.mark_loaded(&self.doc, &id, node, &payload);
                Outcome::Rendered
            }
            Err((err, source)) => {
                debug!(target: "render", %id, error = %err, "Render failed");
                self.write_error(node, &id, &err, &source);
                Outcome::Failed(id)
            }
        }
    }

    fn source_of(&self, node: NodeId) -> String {
        let payload = self.doc.attribute(node, ATTR_PAYLOAD).unwrap_or_default();
        decode_payload(&payload).unwrap_or(payload)
    }

    fn write_error(&self, node: NodeId, id: &str, err: &RenderError, source: &str) {
        if let Some(body) = self.doc.first_class(node, CLASS_BODY) {
            self.doc
                .replace_children(body, &[error_panel(self.kind(), err, source)]);
        }
        self.states.mark_failed(&self.doc, id, node);
    }

    fn schedule_retry(self: &Arc<Self>, ids: &[String], container: NodeId, next: u32, max: u32) {
        debug!(target: "render", kind = %self.kind(), attempt = next, "Scheduling retry");
        let engine = self.clone();
        self.scheduler.schedule(ids, self.settings.retry_delay, async move {
            engine.render_all(container, next, max).await;
        });
    }

    fn finish(self: &Arc<Self>, container: NodeId, report: &SweepReport) {
        if !report.is_clean() {
            let count = report.failed.len();
            self.events.notify(
                format!(
                    "{}: {count} artifact(s) failed after {} attempt(s)",
                    self.kind().label(),
                    report.attempt + 1
                ),
                Severity::Warning,
            );
        }
        self.bind_interactions(container);
    }
}
