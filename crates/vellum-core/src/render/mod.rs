//! Per-kind render engines, their retry scheduler and the interaction
//! binder that runs after every completed sweep.

pub mod adapters;
pub mod engine;
pub mod interaction;
pub mod scheduler;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use vellum_tools::ArtifactKind;

use crate::backends::BackendError;

pub use adapters::{ChartRenderer, DiagramRenderer, TypesetRenderer, artifact_backends};
pub use engine::{EngineSettings, RenderEngine};
pub use scheduler::RetryScheduler;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
pub enum RenderError {
    #[error("could not parse tool call: {0}")]
    ParseFailure(String),
    #[error("{0} renderer is not available")]
    BackendUnavailable(String),
    #[error("{0}")]
    RenderFailure(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("undecodable payload: {0}")]
    Payload(String),
}

impl RenderError {
    /// Stable name written to `data-error-kind` on error panels.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RenderError::ParseFailure(_) => "parse-failure",
            RenderError::BackendUnavailable(_) => "backend-unavailable",
            RenderError::RenderFailure(_) => "render-failure",
            RenderError::TransportFailure(_) => "transport-failure",
            RenderError::Payload(_) => "payload",
        }
    }
}

impl From<BackendError> for RenderError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotInitialized(name) => RenderError::BackendUnavailable(name),
            BackendError::Transport(_) | BackendError::Timeout(_) => {
                RenderError::TransportFailure(err.to_string())
            }
            BackendError::Rejected(message) => RenderError::RenderFailure(message),
            BackendError::Protocol(_) | BackendError::NoResults => {
                RenderError::RenderFailure(err.to_string())
            }
        }
    }
}

/// A renderer for one artifact kind, as seen by its [`RenderEngine`].
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    /// Container-level readiness check, run once per sweep.
    fn ensure_ready(&self) -> Result<(), RenderError>;

    /// Renders `source` to markup for the placeholder `id`.
    async fn render(&self, id: &str, source: &str) -> Result<String, RenderError>;
}

/// Outcome of one pass of [`RenderEngine::render_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub kind: ArtifactKind,
    pub attempt: u32,
    pub rendered: usize,
    pub skipped: usize,
    pub in_flight: usize,
    pub failed: Vec<String>,
    pub retry_scheduled: bool,
    pub container_error: Option<RenderError>,
}

impl SweepReport {
    pub fn new(kind: ArtifactKind, attempt: u32) -> Self {
        Self {
            kind,
            attempt,
            rendered: 0,
            skipped: 0,
            in_flight: 0,
            failed: Vec::new(),
            retry_scheduled: false,
            container_error: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.container_error.is_none()
    }
}
