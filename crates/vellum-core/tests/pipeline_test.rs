use std::sync::Arc;
use std::time::Duration;

use vellum_core::backends::{BackendError, ComputeResult};
use vellum_core::dom::{Document, NodeId};
use vellum_core::events::{OutboundEvent, Severity};
use vellum_core::handlers::DispatchMode;
use vellum_core::pipeline::Pipeline;
use vellum_core::placeholder::{
    ATTR_CLICK_LISTENER, ATTR_KIND, ATTR_LAST_RENDERED, CLASS_ERROR, CLASS_LOADED, CLASS_REFRESH,
    CLASS_ZOOM, DEFERRED_MESSAGE,
};
use vellum_core::preferences::Preferences;
use vellum_core::session::SessionContext;
use vellum_core::test_utils::ast::{
    assign, call, number, print, print_call_json, program, string,
};
use vellum_core::test_utils::{StubBehavior, StubCompute, StubRenderer, backends_with, drain};
use vellum_tools::ArtifactKind;

const DIAGRAM: &str = "graph TD; A-->B";

struct Harness {
    session: Arc<SessionContext>,
    pipeline: Pipeline,
    container: NodeId,
}

impl Harness {
    fn new(renderer: Option<Arc<StubRenderer>>) -> Self {
        Self::with_backends(backends_with(renderer))
    }

    fn with_backends(backends: vellum_core::backends::Backends) -> Self {
        let doc = Document::new();
        let container = doc.create_element(doc.root(), "div").unwrap();
        let session = SessionContext::new(doc, backends, Preferences::default());
        let pipeline = Pipeline::new(session.clone());
        Self {
            session,
            pipeline,
            container,
        }
    }

    fn doc(&self) -> &Document {
        self.session.document()
    }

    fn placeholders(&self, kind: ArtifactKind) -> Vec<NodeId> {
        self.doc()
            .query(self.container, |el| el.attribute(ATTR_KIND) == Some(kind.as_str()))
    }

    fn placeholder(&self, kind: ArtifactKind) -> NodeId {
        self.placeholders(kind)[0]
    }

    async fn insert_mermaid(&self, code: &str, mode: DispatchMode) -> NodeId {
        let source = print_call_json("mermaid_render", &[("mermaid_code", code)]);
        self.pipeline
            .render_tool_call(self.container, &source, mode)
            .await
            .unwrap()
    }

    async fn sweep_mermaid(&self, max_retries: u32) -> vellum_core::SweepReport {
        let engine = self.session.engine(ArtifactKind::Mermaid).unwrap().clone();
        engine.render_all(self.container, 0, max_retries).await
    }

    fn is_healthy(&self, node: NodeId) -> bool {
        self.doc().has_class(node, CLASS_LOADED) && self.doc().first_class(node, CLASS_ERROR).is_none()
    }
}

#[tokio::test(start_paused = true)]
async fn settled_call_renders_inline() {
    let renderer = StubRenderer::succeeding();
    let h = Harness::new(Some(renderer.clone()));

    let wrapper = h.insert_mermaid(DIAGRAM, DispatchMode::Settled).await;
    let node = h.placeholder(ArtifactKind::Mermaid);

    assert!(h.doc().has_class(wrapper, "tool-call"));
    assert!(h.is_healthy(node));
    assert!(h.doc().to_html(node).contains("<svg"));
    assert!(h.doc().attribute(node, ATTR_LAST_RENDERED).is_some());
    assert!(h.doc().attribute(node, "id").unwrap().starts_with("mermaid-"));
    assert_eq!(renderer.calls_for(DIAGRAM), 1);
}

#[tokio::test(start_paused = true)]
async fn streaming_call_defers_without_backend_calls() {
    let renderer = StubRenderer::succeeding();
    let h = Harness::new(Some(renderer.clone()));

    h.insert_mermaid(DIAGRAM, DispatchMode::Streaming).await;
    let node = h.placeholder(ArtifactKind::Mermaid);

    assert!(!h.doc().has_class(node, CLASS_LOADED));
    assert!(h.doc().to_html(node).contains(DEFERRED_MESSAGE));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unchanged_loaded_payload_is_not_rendered_again() {
    let renderer = StubRenderer::succeeding();
    let h = Harness::new(Some(renderer.clone()));
    h.insert_mermaid(DIAGRAM, DispatchMode::Settled).await;

    let report = h.sweep_mermaid(3).await;
    assert_eq!(report.rendered, 0);
    assert_eq!(renderer.calls(), 1);

    // Loaded marker lost, last-rendered still matches: restored, not re-rendered.
    let node = h.placeholder(ArtifactKind::Mermaid);
    let id = h.doc().attribute(node, "id").unwrap();
    h.doc().remove_class(node, CLASS_LOADED);
    h.session.states().forget(&id);

    let report = h.sweep_mermaid(3).await;
    assert_eq!(report.skipped, 1);
    assert_eq!(renderer.calls(), 1);
    assert!(h.doc().has_class(node, CLASS_LOADED));
}

#[tokio::test(start_paused = true)]
async fn always_failing_backend_is_called_max_retries_plus_one_times() {
    let renderer = StubRenderer::failing();
    let h = Harness::new(Some(renderer.clone()));
    let mut rx = h.session.subscribe();
    h.insert_mermaid(DIAGRAM, DispatchMode::Streaming).await;

    let report = h.sweep_mermaid(3).await;
    assert!(report.retry_scheduled);
    assert_eq!(renderer.calls(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(renderer.calls(), 4);

    let node = h.placeholder(ArtifactKind::Mermaid);
    let panel = h.doc().first_class(node, CLASS_ERROR).unwrap();
    assert!(h.doc().to_html(panel).contains(DIAGRAM.replace('>', "&gt;").as_str()));
    assert!(!h.doc().has_class(node, CLASS_LOADED));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        OutboundEvent::Notify { severity: Severity::Warning, .. }
    )));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(renderer.calls(), 4);
    assert!(h.doc().first_class(node, CLASS_ERROR).is_some());
}

#[tokio::test(start_paused = true)]
async fn failures_are_isolated_per_artifact() {
    let renderer = Arc::new(StubRenderer::new(StubBehavior::FailWhenContains(
        "invalid".to_string(),
    )));
    let h = Harness::new(Some(renderer.clone()));
    h.insert_mermaid(DIAGRAM, DispatchMode::Streaming).await;
    h.insert_mermaid("invalid diagram", DispatchMode::Streaming).await;

    let report = h.sweep_mermaid(0).await;
    assert_eq!(report.rendered, 1);
    assert_eq!(report.failed.len(), 1);

    let nodes = h.placeholders(ArtifactKind::Mermaid);
    assert!(h.is_healthy(nodes[0]));
    assert!(h.doc().first_class(nodes[1], CLASS_ERROR).is_some());
    assert!(h.doc().first_class(nodes[0], CLASS_ZOOM).is_some());
    assert!(h.doc().first_class(nodes[1], CLASS_ZOOM).is_none());
}

#[tokio::test(start_paused = true)]
async fn binding_is_idempotent() {
    let h = Harness::new(Some(StubRenderer::succeeding()));
    h.insert_mermaid(DIAGRAM, DispatchMode::Settled).await;
    let engine = h.session.engine(ArtifactKind::Mermaid).unwrap().clone();
    let node = h.placeholder(ArtifactKind::Mermaid);

    for _ in 0..3 {
        engine.bind_interactions(h.container);
    }

    assert_eq!(h.doc().query_class(node, CLASS_REFRESH).len(), 1);
    assert_eq!(h.doc().query_class(node, CLASS_ZOOM).len(), 1);
    assert_eq!(h.doc().listener_count(node), 1);
    assert_eq!(h.doc().attribute(node, ATTR_CLICK_LISTENER).as_deref(), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn refresh_recovers_a_failed_artifact() {
    let renderer = StubRenderer::failing();
    let h = Harness::new(Some(renderer.clone()));
    h.insert_mermaid(DIAGRAM, DispatchMode::Streaming).await;
    h.sweep_mermaid(0).await;

    let node = h.placeholder(ArtifactKind::Mermaid);
    assert!(h.doc().first_class(node, CLASS_ERROR).is_some());
    assert!(h.doc().first_class(node, CLASS_ZOOM).is_none());

    renderer.set_behavior(StubBehavior::Succeed);
    let refresh = h.doc().first_class(node, CLASS_REFRESH).unwrap();
    h.doc().click(refresh);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(h.is_healthy(node));
    assert!(h.doc().first_class(node, CLASS_ZOOM).is_some());
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn artifact_that_starts_failing_loses_zoom() {
    let renderer = StubRenderer::succeeding();
    let h = Harness::new(Some(renderer.clone()));
    h.insert_mermaid(DIAGRAM, DispatchMode::Settled).await;
    h.sweep_mermaid(0).await;
    let node = h.placeholder(ArtifactKind::Mermaid);
    assert!(h.doc().first_class(node, CLASS_ZOOM).is_some());

    renderer.set_behavior(StubBehavior::Fail("boom".to_string()));
    let engine = h.session.engine(ArtifactKind::Mermaid).unwrap().clone();
    let id = h.doc().attribute(node, "id").unwrap();
    let report = engine.refresh(h.container, id).await;
    assert!(report.retry_scheduled);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(h.doc().first_class(node, CLASS_ERROR).is_some());
    assert!(h.doc().first_class(node, CLASS_ZOOM).is_none());
    assert!(h.doc().attribute(node, ATTR_CLICK_LISTENER).is_none());
    assert_eq!(h.doc().listener_count(node), 0);
}

#[tokio::test(start_paused = true)]
async fn zoom_and_expand_open_the_viewer() {
    let h = Harness::new(Some(StubRenderer::succeeding()));
    let mut rx = h.session.subscribe();
    h.insert_mermaid(DIAGRAM, DispatchMode::Settled).await;
    h.sweep_mermaid(0).await;
    let node = h.placeholder(ArtifactKind::Mermaid);
    drain(&mut rx);

    let zoom = h.doc().first_class(node, CLASS_ZOOM).unwrap();
    h.doc().click(zoom);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        OutboundEvent::OpenViewer {
            rendered_markup,
            raw_source,
        } => {
            assert!(rendered_markup.starts_with("<svg"));
            assert_eq!(raw_source, DIAGRAM);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let body = h.doc().first_class(node, "artifact-content").unwrap();
    h.doc().click(body);
    assert_eq!(drain(&mut rx).len(), 1);

    let refresh = h.doc().first_class(node, CLASS_REFRESH).unwrap();
    h.doc().click(refresh);
    assert!(
        drain(&mut rx)
            .iter()
            .all(|e| !matches!(e, OutboundEvent::OpenViewer { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn missing_backend_is_retried_then_reported_inline() {
    let h = Harness::new(None);
    h.insert_mermaid(DIAGRAM, DispatchMode::Streaming).await;

    let report = h.sweep_mermaid(2).await;
    assert!(report.container_error.is_some());
    assert!(report.retry_scheduled);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let node = h.placeholder(ArtifactKind::Mermaid);
    let panel = h.doc().first_class(node, CLASS_ERROR).unwrap();
    assert_eq!(
        h.doc().attribute(panel, "data-error-kind").as_deref(),
        Some("backend-unavailable")
    );
}

#[tokio::test(start_paused = true)]
async fn settled_render_without_backend_shows_error_panel() {
    let h = Harness::new(None);
    h.insert_mermaid(DIAGRAM, DispatchMode::Settled).await;
    let node = h.placeholder(ArtifactKind::Mermaid);

    assert!(!h.doc().has_class(node, CLASS_LOADED));
    assert!(h.doc().first_class(node, CLASS_ERROR).is_some());
}

#[tokio::test(start_paused = true)]
async fn unparseable_source_keeps_raw_text() {
    let h = Harness::new(Some(StubRenderer::succeeding()));
    let wrapper = h
        .pipeline
        .render_tool_call(h.container, "print(default_api.oops(", DispatchMode::Settled)
        .await
        .unwrap();

    let panel = h.doc().first_class(wrapper, CLASS_ERROR).unwrap();
    assert_eq!(
        h.doc().attribute(panel, "data-error-kind").as_deref(),
        Some("transport-failure")
    );
    assert!(h.doc().to_html(panel).contains("print(default_api.oops("));
}

#[tokio::test(start_paused = true)]
async fn non_call_statements_fall_back_to_tree_view() {
    let h = Harness::new(Some(StubRenderer::succeeding()));
    let source = program(vec![
        print(call("default_api", "katex_render", vec![assign("katex_code", string("x^2"))])),
        print(call("other_api", "mermaid_render", vec![assign("mermaid_code", string(DIAGRAM))])),
        number("3"),
    ])
    .to_json_pretty();

    let wrapper = h
        .pipeline
        .render_tool_call(h.container, &source, DispatchMode::Settled)
        .await
        .unwrap();

    assert_eq!(h.placeholders(ArtifactKind::Math).len(), 1);
    assert!(h.placeholders(ArtifactKind::Mermaid).is_empty());
    assert_eq!(h.doc().query_class(wrapper, "tool-call-tree").len(), 2);
}

fn compute_results() -> Vec<ComputeResult> {
    vec![ComputeResult {
        title: Some("Result".to_string()),
        plaintext: Some("42".to_string()),
        related_queries: vec!["6 * 7".to_string()],
        ..Default::default()
    }]
}

#[tokio::test(start_paused = true)]
async fn compute_result_replaces_placeholder_and_is_cached() {
    let compute = Arc::new(StubCompute::new(compute_results()).with_delay(Duration::from_secs(1)));
    let h = Harness::with_backends(backends_with(None).with_compute(compute.clone()));
    let mut rx = h.session.subscribe();
    let source = print_call_json("wolfram_alpha_compute", &[("query", "answer")]);

    h.pipeline
        .render_tool_call(h.container, &source, DispatchMode::Settled)
        .await;
    let node = h.placeholder(ArtifactKind::Compute);
    assert!(!h.doc().has_class(node, CLASS_LOADED));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(h.doc().has_class(node, CLASS_LOADED));
    assert!(h.doc().to_html(node).contains("compute-results"));

    h.session.ensure_global_listener();
    let related = h.doc().first_class(node, "compute-related-query").unwrap();
    h.doc().click(related);
    assert!(drain(&mut rx).contains(&OutboundEvent::SendMessage {
        text: "6 * 7".to_string()
    }));

    h.pipeline
        .render_tool_call(h.container, &source, DispatchMode::Settled)
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(compute.calls(), 1);
    assert!(
        h.placeholders(ArtifactKind::Compute)
            .iter()
            .all(|node| h.doc().has_class(*node, CLASS_LOADED))
    );
}

#[tokio::test(start_paused = true)]
async fn compute_result_for_removed_placeholder_is_dropped() {
    let compute = Arc::new(StubCompute::new(compute_results()).with_delay(Duration::from_secs(1)));
    let h = Harness::with_backends(backends_with(None).with_compute(compute.clone()));
    let source = print_call_json("wolfram_alpha_compute", &[("query", "answer")]);

    let wrapper = h
        .pipeline
        .render_tool_call(h.container, &source, DispatchMode::Settled)
        .await
        .unwrap();
    h.doc().remove(wrapper);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(compute.calls(), 1);
    assert!(h.placeholders(ArtifactKind::Compute).is_empty());
}

#[tokio::test(start_paused = true)]
async fn compute_failure_is_shown_inline() {
    let compute = Arc::new(StubCompute::failing(BackendError::Transport(
        "connection reset".to_string(),
    )));
    let h = Harness::with_backends(backends_with(None).with_compute(compute));
    let source = print_call_json("wolfram_alpha_compute", &[("query", "answer")]);

    h.pipeline
        .render_tool_call(h.container, &source, DispatchMode::Settled)
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let node = h.placeholder(ArtifactKind::Compute);
    let panel = h.doc().first_class(node, CLASS_ERROR).unwrap();
    assert!(h.doc().to_html(panel).contains("connection reset"));
    assert!(h.doc().to_html(panel).contains("answer"));
}

#[tokio::test(start_paused = true)]
async fn streaming_compute_waits_for_completion() {
    let compute = Arc::new(StubCompute::new(compute_results()));
    let h = Harness::with_backends(backends_with(None).with_compute(compute.clone()));
    let source = print_call_json("wolfram_alpha_compute", &[("query", "answer")]);

    h.pipeline
        .render_tool_call(h.container, &source, DispatchMode::Streaming)
        .await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(compute.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_sweeps_render_a_placeholder_once() {
    let renderer = Arc::new(StubRenderer::default().with_delay(Duration::from_millis(100)));
    let h = Harness::new(Some(renderer.clone()));
    h.insert_mermaid(DIAGRAM, DispatchMode::Streaming).await;

    let (first, second) = tokio::join!(h.sweep_mermaid(3), h.sweep_mermaid(3));

    assert_eq!(renderer.calls(), 1);
    assert_eq!(first.rendered + second.rendered, 1);
    assert_eq!(first.in_flight + second.in_flight, 1);
    assert!(first.failed.is_empty() && second.failed.is_empty());
    assert!(h.is_healthy(h.placeholder(ArtifactKind::Mermaid)));
}
