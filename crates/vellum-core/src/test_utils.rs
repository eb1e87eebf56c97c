//! Test utilities for vellum-core
//!
//! Stub backends and parse-tree builders shared by unit and integration
//! tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use vellum_tools::AstNode;

use crate::backends::{
    Backends, BackendError, ComputeBackend, ComputeResult, DiagramLayoutBackend, DiagramOutput,
    JsonAstParser, RenderTarget, StructuredDiagramBackend, TypesetBackend,
};
use crate::events::OutboundEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubBehavior {
    Succeed,
    Fail(String),
    /// Fail any source containing the given text.
    FailWhenContains(String),
}

/// Renderer stub standing in for every rendering library. Counts calls per
/// source and follows a switchable [`StubBehavior`].
#[derive(Debug)]
pub struct StubRenderer {
    behavior: Mutex<StubBehavior>,
    ready: AtomicBool,
    calls: AtomicUsize,
    per_source: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl Default for StubRenderer {
    fn default() -> Self {
        Self::new(StubBehavior::Succeed)
    }
}

impl StubRenderer {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ready: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            per_source: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::new(StubBehavior::Succeed))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::new(StubBehavior::Fail("syntax error".to_string())))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_behavior(&self, behavior: StubBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, source: &str) -> usize {
        self.per_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .copied()
            .unwrap_or(0)
    }

    async fn run(&self, source: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(source.to_string())
            .or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match behavior {
            StubBehavior::Succeed => Ok(format!("<svg data-stub=\"{}\"></svg>", source.len())),
            StubBehavior::Fail(message) => Err(BackendError::Rejected(message)),
            StubBehavior::FailWhenContains(needle) if source.contains(&needle) => {
                Err(BackendError::Rejected(format!("cannot render {needle}")))
            }
            StubBehavior::FailWhenContains(_) => Ok("<svg></svg>".to_string()),
        }
    }
}

#[async_trait]
impl DiagramLayoutBackend for StubRenderer {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn render(&self, _id: &str, source: &str) -> Result<DiagramOutput, BackendError> {
        self.run(source).await.map(|svg| DiagramOutput { svg })
    }
}

#[async_trait]
impl StructuredDiagramBackend for StubRenderer {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn render_to(&self, source: &str, target: RenderTarget) {
        match self.run(source).await {
            Ok(svg) => target.surface.write(svg),
            Err(err) => (target.on_error)(err.to_string()),
        }
    }
}

#[async_trait]
impl TypesetBackend for StubRenderer {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn to_svg(&self, source: &str) -> Result<String, BackendError> {
        self.run(source).await
    }
}

/// Compute stub returning canned results after an optional delay.
#[derive(Debug)]
pub struct StubCompute {
    results: Result<Vec<ComputeResult>, BackendError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubCompute {
    pub fn new(results: Vec<ComputeResult>) -> Self {
        Self {
            results: Ok(results),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            results: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeBackend for StubCompute {
    async fn compute(
        &self,
        _query: &str,
        _image_only: bool,
    ) -> Result<Vec<ComputeResult>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.results.clone()
    }
}

/// Backends with the JSON parser and `renderer` behind every renderable kind.
pub fn backends_with(renderer: Option<Arc<StubRenderer>>) -> Backends {
    let mut backends = Backends::new().with_parser(Arc::new(JsonAstParser));
    if let Some(renderer) = renderer {
        backends = backends
            .with_diagram(renderer.clone())
            .with_chart(renderer.clone())
            .with_typeset(renderer);
    }
    backends
}

/// Next queued event, without waiting.
pub fn recv_now(rx: &mut broadcast::Receiver<OutboundEvent>) -> Option<OutboundEvent> {
    rx.try_recv().ok()
}

/// Drains every queued event.
pub fn drain(rx: &mut broadcast::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Parse-tree builders in the wire vocabulary of the parser backend.
pub mod ast {
    use super::AstNode;

    pub fn var(name: &str) -> AstNode {
        AstNode::new(format!("Variable({name:?})")).with_token(name)
    }

    pub fn string(text: &str) -> AstNode {
        AstNode::new(format!("String({text:?})")).with_token(format!("{text:?}"))
    }

    pub fn number(literal: &str) -> AstNode {
        AstNode::new(format!("Number({literal:?})")).with_token(literal)
    }

    pub fn boolean(value: bool) -> AstNode {
        AstNode::new("Boolean").with_token(if value { "True" } else { "False" })
    }

    pub fn assign(name: &str, value: AstNode) -> AstNode {
        AstNode::new("Assign").with_children(vec![var(name), value])
    }

    pub fn call(namespace: &str, function: &str, args: Vec<AstNode>) -> AstNode {
        AstNode::new("LambdaCall").with_children(vec![
            AstNode::new("GetAttr").with_children(vec![var(namespace), string(function)]),
            AstNode::new("Tuple").with_children(args),
        ])
    }

    pub fn print(inner: AstNode) -> AstNode {
        AstNode::new("LambdaCall").with_children(vec![
            var("print"),
            AstNode::new("Tuple").with_children(vec![inner]),
        ])
    }

    pub fn program(statements: Vec<AstNode>) -> AstNode {
        AstNode::new("Expressions").with_children(statements)
    }

    /// `print(default_api.<function>(<name>="<value>", ..))` as wire JSON.
    pub fn print_call_json(function: &str, args: &[(&str, &str)]) -> String {
        let args = args
            .iter()
            .map(|(name, value)| assign(name, string(value)))
            .collect();
        program(vec![print(call("default_api", function, args))]).to_json_pretty()
    }
}
