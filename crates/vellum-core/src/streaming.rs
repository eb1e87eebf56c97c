//! Defers rendering while a message streams and re-renders everything once
//! it completes.
//!
//! The coordinator is fed the whole message text each time it grows. Blocks
//! are identified by their position in the message, so a block seen twice
//! keeps its wrapper and the placeholder state inside it.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};
use vellum_tools::blocks::{MessageSegment, split_message, tool_code_blocks};

use crate::dom::NodeId;
use crate::handlers::DispatchMode;
use crate::pipeline::Pipeline;
use crate::placeholder::{ATTR_ID, ATTR_KIND, ATTR_TOOL_SOURCE, CLASS_TOOL_CALL};
use crate::render::SweepReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    /// Absorbing.
    Completed,
}

/// A block already inserted, by message position.
#[derive(Debug)]
struct BlockSlot {
    wrapper: NodeId,
    source: String,
}

pub struct StreamingCoordinator {
    pipeline: Pipeline,
    container: NodeId,
    state: Mutex<StreamState>,
    blocks: tokio::sync::Mutex<Vec<BlockSlot>>,
}

/// Blocks of a finished message. A trailing unterminated block is final
/// at this point and counts too.
fn final_blocks(message: &str) -> Vec<String> {
    split_message(message)
        .into_iter()
        .filter_map(|segment| match segment {
            MessageSegment::ToolCode(code) => Some(code),
            MessageSegment::PartialToolCode(code) if !code.trim().is_empty() => Some(code),
            _ => None,
        })
        .collect()
}

impl StreamingCoordinator {
    pub fn new(pipeline: Pipeline, container: NodeId) -> Self {
        Self {
            pipeline,
            container,
            state: Mutex::new(StreamState::Streaming),
            blocks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// For a message loaded from history: already complete.
    pub fn from_history(pipeline: Pipeline, container: NodeId) -> Self {
        Self {
            pipeline,
            container,
            state: Mutex::new(StreamState::Completed),
            blocks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn mode(&self) -> DispatchMode {
        match self.state() {
            StreamState::Streaming => DispatchMode::Streaming,
            StreamState::Completed => DispatchMode::Settled,
        }
    }

    /// Inserts one tool-call block. Completed messages are swept right away.
    pub async fn on_code_block(&self, source: &str) -> Option<NodeId> {
        let mode = self.mode();
        let wrapper = self
            .pipeline
            .render_tool_call(self.container, source, mode)
            .await;
        if mode == DispatchMode::Settled {
            let session = self.pipeline.session();
            session
                .sweep(self.container, session.preferences().render.max_retries)
                .await;
        }
        wrapper
    }

    /// Brings the container in line with `message`, the full text received
    /// so far. Returns the wrappers inserted for blocks not seen before.
    pub async fn on_message(&self, message: &str) -> Vec<NodeId> {
        let mut blocks = self.blocks.lock().await;
        self.reconcile(&mut blocks, tool_code_blocks(message)).await
    }

    async fn reconcile(&self, slots: &mut Vec<BlockSlot>, sources: Vec<String>) -> Vec<NodeId> {
        let doc = self.pipeline.session().document();
        let mut inserted = Vec::new();
        for (index, source) in sources.into_iter().enumerate() {
            match slots.get_mut(index) {
                Some(slot) if slot.source == source => {}
                Some(slot) => {
                    debug!(target: "streaming", index, "Tool call block changed");
                    slot.source = source;
                    if doc.set_attribute(slot.wrapper, ATTR_TOOL_SOURCE, &slot.source) {
                        self.redispatch(slot.wrapper).await;
                    }
                }
                None => {
                    let Some(wrapper) = self.on_code_block(&source).await else {
                        debug!(target: "streaming", "Container gone");
                        break;
                    };
                    inserted.push(wrapper);
                    slots.push(BlockSlot { wrapper, source });
                }
            }
        }
        inserted
    }

    async fn redispatch(&self, wrapper: NodeId) {
        let mode = self.mode();
        self.pipeline.redispatch(wrapper, mode).await;
        if mode == DispatchMode::Settled {
            let session = self.pipeline.session();
            session
                .sweep(self.container, session.preferences().render.max_retries)
                .await;
        }
    }

    /// Streaming → Completed: pick up the blocks of `final_message` not
    /// seen yet, reset every placeholder, re-dispatch every tool call
    /// settled, then sweep twice and bind.
    ///
    /// A no-op returning no reports when already completed.
    pub async fn complete(&self, final_message: &str) -> Vec<SweepReport> {
        {
            let mut blocks = self.blocks.lock().await;
            if self.state() == StreamState::Completed {
                return Vec::new();
            }
            self.reconcile(&mut blocks, final_blocks(final_message)).await;
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = StreamState::Completed;
        }
        info!(target: "streaming", container = %self.container, "Message completed");

        let session = self.pipeline.session();
        let doc = session.document();
        let placeholders = doc.query(self.container, |el| {
            el.attribute(ATTR_KIND).is_some() && el.attribute(ATTR_ID).is_some()
        });
        for node in placeholders {
            if let Some(id) = doc.attribute(node, ATTR_ID) {
                session.scheduler().cancel(&id);
                session.states().reset(doc, &id, node);
            }
        }

        for wrapper in doc.query_class(self.container, CLASS_TOOL_CALL) {
            self.pipeline.redispatch(wrapper, DispatchMode::Settled).await;
        }

        let prefs = &session.preferences().render;
        let mut reports = session
            .sweep(self.container, prefs.completion_max_retries)
            .await;
        tokio::time::sleep(prefs.confirm_sweep_delay()).await;
        debug!(target: "streaming", "Confirmation sweep");
        reports.extend(
            session
                .sweep(self.container, prefs.completion_max_retries)
                .await,
        );
        session.bind_all(self.container);
        reports
    }
}
