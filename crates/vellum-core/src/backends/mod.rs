//! Boundaries to the external collaborators: the source parser, the
//! rendering libraries and the compute service.

pub mod format;
pub mod parser;
pub mod wolfram;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vellum_tools::AstNode;

pub use format::ComputeFormat;
pub use parser::JsonAstParser;
pub use wolfram::WolframAlphaClient;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0} is not initialized")]
    NotInitialized(String),
    #[error("{0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("no results")]
    NoResults,
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Turns tool-call source text into a parse tree.
#[async_trait]
pub trait ParserBackend: Send + Sync {
    async fn parse_code(&self, source: &str) -> Result<AstNode>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramOutput {
    pub svg: String,
}

/// Layout-style diagram library: returns the finished SVG.
#[async_trait]
pub trait DiagramLayoutBackend: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    async fn render(&self, id: &str, source: &str) -> Result<DiagramOutput>;
}

/// Element handle a [`StructuredDiagramBackend`] draws into.
#[derive(Clone, Default)]
pub struct RenderSurface {
    content: Arc<Mutex<Option<String>>>,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, markup: impl Into<String>) {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = Some(markup.into());
    }

    pub fn take(&self) -> Option<String> {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSurface").finish_non_exhaustive()
    }
}

pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

pub struct RenderTarget {
    pub surface: RenderSurface,
    pub config: serde_json::Value,
    pub on_error: ErrorCallback,
}

/// Chart-style library: draws into a surface and reports failures through
/// `target.on_error` instead of a return value.
#[async_trait]
pub trait StructuredDiagramBackend: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    async fn render_to(&self, source: &str, target: RenderTarget);
}

/// Typesetting engine, used for both documents and standalone formulas.
#[async_trait]
pub trait TypesetBackend: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    async fn to_svg(&self, source: &str) -> Result<String>;
}

/// One result block of a compute query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResult {
    pub title: Option<String>,
    pub plaintext: Option<String>,
    pub minput: Option<String>,
    pub moutput: Option<String>,
    pub img_base64: Option<String>,
    pub img_contenttype: Option<String>,
    #[serde(default)]
    pub related_queries: Vec<String>,
}

#[async_trait]
pub trait ComputeBackend: Send + Sync {
    async fn compute(&self, query: &str, image_only: bool) -> Result<Vec<ComputeResult>>;
}

/// The collaborators available to a session. A missing backend surfaces as
/// `BackendUnavailable` when an artifact of its kind is rendered.
#[derive(Clone, Default)]
pub struct Backends {
    pub parser: Option<Arc<dyn ParserBackend>>,
    pub diagram: Option<Arc<dyn DiagramLayoutBackend>>,
    pub chart: Option<Arc<dyn StructuredDiagramBackend>>,
    pub typeset: Option<Arc<dyn TypesetBackend>>,
    pub compute: Option<Arc<dyn ComputeBackend>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(mut self, parser: Arc<dyn ParserBackend>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_diagram(mut self, diagram: Arc<dyn DiagramLayoutBackend>) -> Self {
        self.diagram = Some(diagram);
        self
    }

    pub fn with_chart(mut self, chart: Arc<dyn StructuredDiagramBackend>) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn with_typeset(mut self, typeset: Arc<dyn TypesetBackend>) -> Self {
        self.typeset = Some(typeset);
        self
    }

    pub fn with_compute(mut self, compute: Arc<dyn ComputeBackend>) -> Self {
        self.compute = Some(compute);
        self
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("parser", &self.parser.is_some())
            .field("diagram", &self.diagram.is_some())
            .field("chart", &self.chart.is_some())
            .field("typeset", &self.typeset.is_some())
            .field("compute", &self.compute.is_some())
            .finish()
    }
}
