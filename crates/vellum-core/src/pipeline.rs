use std::sync::Arc;

use tracing::{debug, instrument};
use vellum_tools::ast::normalize;
use vellum_tools::interpret_program;

use crate::dispatch::{Dispatcher, failure_fragment, tree_view};
use crate::dom::{Markup, NodeId};
use crate::handlers::{DispatchMode, HandlerContext, HandlerRegistry};
use crate::placeholder::{ATTR_TOOL_SOURCE, CLASS_TOOL_CALL};
use crate::render::RenderError;
use crate::session::SessionContext;

/// Source text of one tool call to document fragments.
#[derive(Clone)]
pub struct Pipeline {
    session: Arc<SessionContext>,
    dispatcher: Arc<Dispatcher>,
}

impl Pipeline {
    pub fn new(session: Arc<SessionContext>) -> Self {
        let namespace = session.preferences().dispatch.namespace.clone();
        let dispatcher = Dispatcher::new(HandlerRegistry::with_builtin(), namespace);
        Self::with_dispatcher(session, Arc::new(dispatcher))
    }

    pub fn with_dispatcher(session: Arc<SessionContext>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            session,
            dispatcher,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Appends a `.tool-call` wrapper for `source` to `container` and fills
    /// it. Returns the wrapper, or `None` if `container` is gone.
    #[instrument(skip(self, source), fields(len = source.len()))]
    pub async fn render_tool_call(
        &self,
        container: NodeId,
        source: &str,
        mode: DispatchMode,
    ) -> Option<NodeId> {
        self.session.ensure_styles();
        let doc = self.session.document();
        let wrapper = doc.append_markup(
            container,
            &Markup::div()
                .class(CLASS_TOOL_CALL)
                .attr(ATTR_TOOL_SOURCE, source),
        )?;
        self.fill(wrapper, source, mode).await;
        Some(wrapper)
    }

    /// Rebuilds a wrapper's content from its recorded source.
    pub async fn redispatch(&self, wrapper: NodeId, mode: DispatchMode) -> bool {
        let doc = self.session.document();
        let Some(source) = doc.attribute(wrapper, ATTR_TOOL_SOURCE) else {
            return false;
        };
        doc.clear_children(wrapper);
        self.fill(wrapper, &source, mode).await;
        true
    }

    async fn fill(&self, wrapper: NodeId, source: &str, mode: DispatchMode) {
        let doc = self.session.document();

        let parsed = match self.session.backends().parser.clone() {
            Some(parser) => parser
                .parse_code(source)
                .await
                .map_err(|e| RenderError::TransportFailure(e.to_string())),
            None => Err(RenderError::BackendUnavailable("Parser".to_string())),
        };
        let mut tree = match parsed {
            Ok(tree) => tree,
            Err(err) => {
                debug!(target: "pipeline", error = %err, "Parse step failed");
                doc.append_markup(wrapper, &failure_fragment(&err, source));
                return;
            }
        };
        normalize(&mut tree);

        let statements = interpret_program(&tree);
        if statements.is_empty() {
            let err = RenderError::ParseFailure("no statements".to_string());
            doc.append_markup(wrapper, &failure_fragment(&err, source));
            return;
        }

        let ctx = HandlerContext {
            session: self.session.clone(),
            mode,
        };
        for (statement, descriptor) in statements {
            let output = match &descriptor {
                Some(descriptor) => self.dispatcher.dispatch(descriptor, &ctx).await,
                None => None,
            };
            if !doc.contains(wrapper) {
                debug!(target: "pipeline", "Wrapper removed while dispatching");
                return;
            }
            match output {
                Some(output) => {
                    doc.append_markup(wrapper, &output.markup);
                    if let Some(task) = output.task {
                        tokio::spawn(task);
                    }
                }
                None => {
                    doc.append_markup(wrapper, &tree_view(&statement, source));
                }
            }
        }
    }
}
