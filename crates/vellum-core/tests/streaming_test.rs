use std::sync::Arc;

use vellum_core::dom::{Document, NodeId};
use vellum_core::handlers::DispatchMode;
use vellum_core::pipeline::Pipeline;
use vellum_core::placeholder::{
    ATTR_KIND, ATTR_TOOL_SOURCE, CLASS_ERROR, CLASS_LOADED, CLASS_TOOL_CALL, CLASS_ZOOM,
    DEFERRED_MESSAGE,
};
use vellum_core::preferences::Preferences;
use vellum_core::session::SessionContext;
use vellum_core::streaming::{StreamState, StreamingCoordinator};
use vellum_core::test_utils::ast::print_call_json;
use vellum_core::test_utils::{StubRenderer, backends_with};

fn coordinator(renderer: Arc<StubRenderer>, history: bool) -> (StreamingCoordinator, Arc<SessionContext>) {
    let doc = Document::new();
    let container = doc.create_element(doc.root(), "div").unwrap();
    let session = SessionContext::new(doc, backends_with(Some(renderer)), Preferences::default());
    let pipeline = Pipeline::new(session.clone());
    let coordinator = if history {
        StreamingCoordinator::from_history(pipeline, container)
    } else {
        StreamingCoordinator::new(pipeline, container)
    };
    (coordinator, session)
}

fn artifacts(session: &SessionContext, container: NodeId) -> Vec<NodeId> {
    session
        .document()
        .query(container, |el| el.attribute(ATTR_KIND).is_some())
}

fn first_block() -> String {
    print_call_json("mermaid_render", &[("mermaid_code", "graph TD; A-->B")])
}

fn second_block() -> String {
    print_call_json("katex_render", &[("katex_code", "e^{i\\pi} + 1 = 0")])
}

fn message() -> String {
    format!(
        "First:\n```tool_code\n{}\n```\nThen:\n```tool_code\n{}\n```\n",
        first_block(),
        second_block(),
    )
}

fn wrappers(session: &SessionContext, container: NodeId) -> Vec<NodeId> {
    session.document().query_class(container, CLASS_TOOL_CALL)
}

#[tokio::test(start_paused = true)]
async fn completion_renders_deferred_artifacts() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer.clone(), false);
    assert_eq!(coordinator.mode(), DispatchMode::Streaming);

    let wrappers = coordinator.on_message(&message()).await;
    assert_eq!(wrappers.len(), 2);
    assert_eq!(renderer.calls(), 0);
    let doc = session.document();
    for node in artifacts(&session, coordinator.container()) {
        assert!(doc.to_html(node).contains(DEFERRED_MESSAGE));
    }

    let reports = coordinator.complete(&message()).await;
    assert!(!reports.is_empty());
    assert_eq!(coordinator.state(), StreamState::Completed);
    assert_eq!(renderer.calls(), 2);

    let nodes = artifacts(&session, coordinator.container());
    assert_eq!(nodes.len(), 2);
    for node in nodes {
        assert!(doc.has_class(node, CLASS_LOADED));
        assert!(doc.first_class(node, CLASS_ERROR).is_none());
        assert!(doc.first_class(node, CLASS_ZOOM).is_some());
    }

    assert!(coordinator.complete(&message()).await.is_empty());
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn history_messages_render_immediately() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer.clone(), true);
    assert_eq!(coordinator.state(), StreamState::Completed);

    coordinator.on_message(&message()).await;
    assert_eq!(renderer.calls(), 2);
    for node in artifacts(&session, coordinator.container()) {
        assert!(session.document().has_class(node, CLASS_LOADED));
    }
}

#[tokio::test(start_paused = true)]
async fn unterminated_block_is_not_dispatched() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer, false);

    let wrappers = coordinator
        .on_message("Working on it\n```tool_code\nprint(default_api.mermaid_render(")
        .await;
    assert!(wrappers.is_empty());
    assert!(artifacts(&session, coordinator.container()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn growing_message_inserts_each_block_once() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer.clone(), false);
    let full = message();
    let first_end = full.find("Then:").unwrap();
    let mid_second = full.rfind("```\n").unwrap() - 20;

    let mut inserted = Vec::new();
    for end in [first_end, mid_second, full.len()] {
        inserted.extend(coordinator.on_message(&full[..end]).await);
    }
    assert_eq!(inserted.len(), 2);
    assert_eq!(wrappers(&session, coordinator.container()).len(), 2);
    assert_eq!(artifacts(&session, coordinator.container()).len(), 2);
    assert_eq!(renderer.calls(), 0);

    assert!(coordinator.on_message(&full).await.is_empty());

    coordinator.complete(&full).await;
    assert_eq!(artifacts(&session, coordinator.container()).len(), 2);
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn completion_picks_up_block_closed_in_last_chunk() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer.clone(), false);
    let full = message();
    let cut = full.rfind("```\n").unwrap();

    coordinator.on_message(&full[..cut]).await;
    assert_eq!(wrappers(&session, coordinator.container()).len(), 1);

    coordinator.complete(&full).await;
    let nodes = artifacts(&session, coordinator.container());
    assert_eq!(nodes.len(), 2);
    for node in nodes {
        assert!(session.document().has_class(node, CLASS_LOADED));
    }
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn unclosed_final_block_is_rendered_on_completion() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer.clone(), false);
    let message = format!("Here:\n```tool_code\n{}\n", first_block());

    assert!(coordinator.on_message(&message).await.is_empty());
    coordinator.complete(&message).await;

    let nodes = artifacts(&session, coordinator.container());
    assert_eq!(nodes.len(), 1);
    assert!(session.document().has_class(nodes[0], CLASS_LOADED));
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn changed_block_keeps_its_wrapper() {
    let renderer = StubRenderer::succeeding();
    let (coordinator, session) = coordinator(renderer.clone(), false);

    let before = format!("```tool_code\n{}\n```\n", first_block());
    let after = format!("```tool_code\n{}\n```\n", second_block());
    let inserted = coordinator.on_message(&before).await;
    assert_eq!(inserted.len(), 1);
    assert!(coordinator.on_message(&after).await.is_empty());

    let doc = session.document();
    let all = wrappers(&session, coordinator.container());
    assert_eq!(all, inserted);
    assert_eq!(doc.attribute(all[0], ATTR_TOOL_SOURCE), Some(second_block()));
    let nodes = artifacts(&session, coordinator.container());
    assert_eq!(nodes.len(), 1);
    assert_eq!(doc.attribute(nodes[0], ATTR_KIND).as_deref(), Some("math"));
    assert_eq!(renderer.calls(), 0);
}
