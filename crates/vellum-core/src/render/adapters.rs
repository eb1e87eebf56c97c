use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use vellum_tools::ArtifactKind;

use super::{ArtifactBackend, RenderError};
use crate::backends::{
    Backends, DiagramLayoutBackend, RenderSurface, RenderTarget, StructuredDiagramBackend,
    TypesetBackend,
};

fn unavailable(kind: ArtifactKind) -> RenderError {
    RenderError::BackendUnavailable(kind.label().to_string())
}

pub struct DiagramRenderer {
    backend: Option<Arc<dyn DiagramLayoutBackend>>,
}

impl DiagramRenderer {
    pub fn new(backend: Option<Arc<dyn DiagramLayoutBackend>>) -> Self {
        Self { backend }
    }

    fn backend(&self) -> Result<&Arc<dyn DiagramLayoutBackend>, RenderError> {
        match &self.backend {
            Some(backend) if backend.is_ready() => Ok(backend),
            _ => Err(unavailable(ArtifactKind::Mermaid)),
        }
    }
}

#[async_trait]
impl ArtifactBackend for DiagramRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Mermaid
    }

    fn ensure_ready(&self) -> Result<(), RenderError> {
        self.backend().map(|_| ())
    }

    async fn render(&self, id: &str, source: &str) -> Result<String, RenderError> {
        let output = self.backend()?.render(id, source).await?;
        Ok(output.svg)
    }
}

/// Adapts the callback-reporting chart library to a `Result`.
pub struct ChartRenderer {
    backend: Option<Arc<dyn StructuredDiagramBackend>>,
    config: serde_json::Value,
}

impl ChartRenderer {
    pub fn new(backend: Option<Arc<dyn StructuredDiagramBackend>>) -> Self {
        Self {
            backend,
            config: serde_json::json!({ "renderer": "svg", "actions": false }),
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    fn backend(&self) -> Result<&Arc<dyn StructuredDiagramBackend>, RenderError> {
        match &self.backend {
            Some(backend) if backend.is_ready() => Ok(backend),
            _ => Err(unavailable(ArtifactKind::Chart)),
        }
    }
}

#[async_trait]
impl ArtifactBackend for ChartRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Chart
    }

    fn ensure_ready(&self) -> Result<(), RenderError> {
        self.backend().map(|_| ())
    }

    async fn render(&self, _id: &str, source: &str) -> Result<String, RenderError> {
        let backend = self.backend()?;
        let surface = RenderSurface::new();
        let reported: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let sink = reported.clone();

        backend
            .render_to(
                source,
                RenderTarget {
                    surface: surface.clone(),
                    config: self.config.clone(),
                    on_error: Arc::new(move |message| {
                        *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
                    }),
                },
            )
            .await;

        let reported = reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(message) = reported {
            return Err(RenderError::RenderFailure(message));
        }
        surface
            .take()
            .ok_or_else(|| RenderError::RenderFailure("chart produced no output".to_string()))
    }
}

/// Typesetting adapter shared by documents and formulas.
pub struct TypesetRenderer {
    kind: ArtifactKind,
    backend: Option<Arc<dyn TypesetBackend>>,
}

impl TypesetRenderer {
    pub fn new(kind: ArtifactKind, backend: Option<Arc<dyn TypesetBackend>>) -> Self {
        Self { kind, backend }
    }

    fn backend(&self) -> Result<&Arc<dyn TypesetBackend>, RenderError> {
        match &self.backend {
            Some(backend) if backend.is_ready() => Ok(backend),
            _ => Err(unavailable(self.kind)),
        }
    }
}

#[async_trait]
impl ArtifactBackend for TypesetRenderer {
    fn kind(&self) -> ArtifactKind {
        self.kind
    }

    fn ensure_ready(&self) -> Result<(), RenderError> {
        self.backend().map(|_| ())
    }

    async fn render(&self, _id: &str, source: &str) -> Result<String, RenderError> {
        Ok(self.backend()?.to_svg(source).await?)
    }
}

/// One adapter per renderable kind.
pub fn artifact_backends(backends: &Backends) -> Vec<Arc<dyn ArtifactBackend>> {
    vec![
        Arc::new(DiagramRenderer::new(backends.diagram.clone())),
        Arc::new(ChartRenderer::new(backends.chart.clone())),
        Arc::new(TypesetRenderer::new(
            ArtifactKind::Typeset,
            backends.typeset.clone(),
        )),
        Arc::new(TypesetRenderer::new(
            ArtifactKind::Math,
            backends.typeset.clone(),
        )),
    ]
}
