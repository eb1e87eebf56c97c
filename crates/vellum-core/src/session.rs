//! Per-application state shared by the dispatcher, engines and coordinators.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use lru::LruCache;
use tokio::sync::broadcast;
use tracing::debug;
use vellum_tools::ArtifactKind;

use crate::backends::{Backends, ComputeResult};
use crate::backends::format::RELATED_QUERY_CLASS;
use crate::dom::{ClickEvent, Document, Markup, NodeId};
use crate::events::{EventSink, OutboundEvent};
use crate::placeholder::StateTable;
use crate::preferences::Preferences;
use crate::render::{RenderEngine, RetryScheduler, SweepReport, artifact_backends};

pub const SEND_BUTTON_CLASS: &str = "tool-send-button";
pub const GLOBAL_LISTENER: &str = "global-actions";
pub const STYLE_ELEMENT_ID: &str = "vellum-artifact-styles";

const ARTIFACT_STYLES: &str = "\
.tool-artifact{position:relative;margin:8px 0}\
.tool-artifact .artifact-toolbar{position:absolute;top:4px;right:4px}\
.tool-artifact[data-has-click-listener=\"true\"] .artifact-body{cursor:zoom-in}\
.artifact-error{border:1px solid #d33;padding:8px}\
.artifact-error pre{white-space:pre-wrap}\
.compute-related-query{cursor:pointer;text-decoration:underline}";

pub struct SessionContext {
    doc: Document,
    preferences: Preferences,
    backends: Backends,
    states: Arc<StateTable>,
    scheduler: RetryScheduler,
    events: EventSink,
    engines: HashMap<ArtifactKind, Arc<RenderEngine>>,
    compute_cache: Mutex<LruCache<String, Vec<ComputeResult>>>,
    styles_injected: AtomicBool,
    global_listener_registered: AtomicBool,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("backends", &self.backends)
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(doc: Document, backends: Backends, preferences: Preferences) -> Arc<Self> {
        let states = Arc::new(StateTable::new());
        let scheduler = RetryScheduler::new();
        let events = EventSink::new();
        let settings = preferences.render.engine_settings();

        let engines = artifact_backends(&backends)
            .into_iter()
            .map(|backend| {
                let kind = backend.kind();
                let engine = RenderEngine::new(
                    backend,
                    doc.clone(),
                    states.clone(),
                    scheduler.clone(),
                    events.clone(),
                    settings,
                );
                (kind, engine)
            })
            .collect();

        let limit = NonZeroUsize::new(preferences.compute.cache_limit).unwrap_or(NonZeroUsize::MIN);

        Arc::new(Self {
            doc,
            preferences,
            backends,
            states,
            scheduler,
            events,
            engines,
            compute_cache: Mutex::new(LruCache::new(limit)),
            styles_injected: AtomicBool::new(false),
            global_listener_registered: AtomicBool::new(false),
        })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn states(&self) -> &Arc<StateTable> {
        &self.states
    }

    pub fn scheduler(&self) -> &RetryScheduler {
        &self.scheduler
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.events.subscribe()
    }

    pub fn engine(&self, kind: ArtifactKind) -> Option<&Arc<RenderEngine>> {
        self.engines.get(&kind)
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<RenderEngine>> {
        ArtifactKind::RENDERABLE
            .iter()
            .filter_map(|kind| self.engines.get(kind))
    }

    /// Sweeps `container` with every engine concurrently.
    pub async fn sweep(&self, container: NodeId, max_retries: u32) -> Vec<SweepReport> {
        join_all(
            self.engines()
                .map(|engine| engine.clone().render_all(container, 0, max_retries)),
        )
        .await
    }

    pub fn bind_all(&self, container: NodeId) {
        for engine in self.engines() {
            engine.bind_interactions(container);
        }
    }

    pub fn compute_cache_key(query: &str, image_only: bool) -> String {
        format!("{query}-{image_only}")
    }

    pub fn cached_compute(&self, key: &str) -> Option<Vec<ComputeResult>> {
        self.compute_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn cache_compute(&self, key: String, results: Vec<ComputeResult>) {
        self.compute_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, results);
    }

    pub fn compute_cache_len(&self) -> usize {
        self.compute_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Appends the artifact stylesheet to the document once.
    pub fn ensure_styles(&self) -> bool {
        if self.styles_injected.swap(true, Ordering::SeqCst) {
            return false;
        }
        let style = Markup::element("style")
            .id(STYLE_ELEMENT_ID)
            .html(ARTIFACT_STYLES);
        self.doc.append_markup(self.doc.root(), &style);
        true
    }

    /// Installs the delegated root listener for send buttons and related
    /// compute queries, once per session.
    pub fn ensure_global_listener(&self) -> bool {
        if self.global_listener_registered.swap(true, Ordering::SeqCst) {
            return false;
        }
        let doc = self.doc.clone();
        let events = self.events.clone();
        self.doc.add_listener(
            self.doc.root(),
            GLOBAL_LISTENER,
            Arc::new(move |click: &ClickEvent| {
                let text = if let Some(button) = doc.closest_class(click.target, SEND_BUTTON_CLASS) {
                    doc.attribute(button, "data-message")
                } else if let Some(item) = doc.closest_class(click.target, RELATED_QUERY_CLASS) {
                    doc.attribute(item, "data-query")
                } else {
                    None
                };
                if let Some(text) = text {
                    debug!(target: "session", "Delegated click sends a message");
                    events.emit(OutboundEvent::SendMessage { text });
                }
            }),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{backends_with, recv_now};

    #[tokio::test]
    async fn compute_cache_evicts_least_recent() {
        let mut prefs = Preferences::default();
        prefs.compute.cache_limit = 2;
        let session = SessionContext::new(Document::new(), Backends::new(), prefs);

        session.cache_compute("a".to_string(), Vec::new());
        session.cache_compute("b".to_string(), Vec::new());
        assert!(session.cached_compute("a").is_some());
        session.cache_compute("c".to_string(), Vec::new());

        assert_eq!(session.compute_cache_len(), 2);
        assert!(session.cached_compute("b").is_none());
        assert!(session.cached_compute("a").is_some());
        assert_eq!(SessionContext::compute_cache_key("pi", true), "pi-true");
    }

    #[tokio::test]
    async fn one_time_flags() {
        let session = SessionContext::new(Document::new(), backends_with(None), Preferences::default());
        let doc = session.document().clone();

        assert!(session.ensure_styles());
        assert!(!session.ensure_styles());
        assert_eq!(doc.query(doc.root(), |el| el.tag() == "style").len(), 1);

        assert!(session.ensure_global_listener());
        assert!(!session.ensure_global_listener());
        assert_eq!(doc.listener_count(doc.root()), 1);
    }

    #[tokio::test]
    async fn send_button_emits_message() {
        let session = SessionContext::new(Document::new(), Backends::new(), Preferences::default());
        let mut rx = session.subscribe();
        session.ensure_global_listener();

        let doc = session.document();
        let button = doc
            .append_markup(
                doc.root(),
                &Markup::element("button")
                    .class(SEND_BUTTON_CLASS)
                    .attr("data-message", "Show me more")
                    .child(Markup::element("span").text("More")),
            )
            .unwrap();
        let label = doc.children(button)[0];
        doc.click(label);

        assert_eq!(
            recv_now(&mut rx),
            Some(OutboundEvent::SendMessage {
                text: "Show me more".to_string()
            })
        );
    }
}
