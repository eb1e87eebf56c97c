//! Artifact handlers: one per tool function the model may call.

pub mod artifact;
pub mod button;
pub mod compute;
pub mod instructions;
pub mod registry;
pub mod sandbox;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;
use vellum_tools::{ArtifactKind, ToolSchema, ToolSpec};

use crate::dom::Markup;
use crate::session::SessionContext;

pub use artifact::{
    KatexHandler, MermaidHandler, PintoraHandler, RenderArtifactHandler, TypstHandler,
};
pub use button::ButtonHandler;
pub use compute::ComputeHandler;
pub use registry::HandlerRegistry;
pub use sandbox::SandboxHandler;

/// Whether the enclosing message is still streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Mid-stream: emit deferred placeholders, touch no backend.
    Streaming,
    /// Message complete: render inline.
    Settled,
}

#[derive(Clone)]
pub struct HandlerContext {
    pub session: Arc<SessionContext>,
    pub mode: DispatchMode,
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Markup for the document plus work to start once it is inserted.
pub struct HandlerOutput {
    pub markup: Markup,
    pub task: Option<BoxFuture<'static, ()>>,
}

impl HandlerOutput {
    pub fn markup(markup: Markup) -> Self {
        Self { markup, task: None }
    }

    pub fn with_task(mut self, task: BoxFuture<'static, ()>) -> Self {
        self.task = Some(task);
        self
    }
}

impl fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOutput")
            .field("markup", &self.markup)
            .field("task", &self.task.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Invalid parameters for {tool}: {message}")]
    InvalidParams { tool: String, message: String },
}

#[async_trait]
pub trait ArtifactHandler: Send + Sync + 'static {
    type Spec: ToolSpec;

    async fn handle(
        &self,
        params: <Self::Spec as ToolSpec>::Params,
        ctx: &HandlerContext,
    ) -> HandlerOutput;
}

#[async_trait]
pub trait ArtifactHandlerErased: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> ArtifactKind;
    fn schema(&self) -> ToolSchema;

    async fn handle_erased(
        &self,
        arguments: serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<HandlerOutput, HandlerError>;
}

#[async_trait]
impl<T> ArtifactHandlerErased for T
where
    T: ArtifactHandler,
{
    fn name(&self) -> &'static str {
        T::Spec::NAME
    }

    fn kind(&self) -> ArtifactKind {
        T::Spec::KIND
    }

    fn schema(&self) -> ToolSchema {
        T::Spec::schema()
    }

    async fn handle_erased(
        &self,
        arguments: serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<HandlerOutput, HandlerError> {
        let params: <T::Spec as ToolSpec>::Params =
            serde_json::from_value(arguments).map_err(|e| HandlerError::InvalidParams {
                tool: T::Spec::NAME.to_string(),
                message: e.to_string(),
            })?;
        Ok(self.handle(params, ctx).await)
    }
}
