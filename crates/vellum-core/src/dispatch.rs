use tracing::{debug, instrument};
use vellum_tools::{AstNode, CallDescriptor};

use crate::dom::Markup;
use crate::handlers::{HandlerContext, HandlerError, HandlerOutput, HandlerRegistry};
use crate::placeholder::CLASS_ERROR;
use crate::render::RenderError;

pub const TREE_VIEW_CLASS: &str = "tool-call-tree";

/// Routes call descriptors to handlers by function name.
pub struct Dispatcher {
    registry: HandlerRegistry,
    namespace: String,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry, namespace: impl Into<String>) -> Self {
        Self {
            registry,
            namespace: namespace.into(),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `None` means "not ours": the caller shows the generic tree view.
    #[instrument(skip_all, fields(function = ?descriptor.function_name))]
    pub async fn dispatch(
        &self,
        descriptor: &CallDescriptor,
        ctx: &HandlerContext,
    ) -> Option<HandlerOutput> {
        if descriptor.api_name.as_deref() != Some(self.namespace.as_str()) {
            debug!(target: "dispatch", api = ?descriptor.api_name, "Foreign namespace");
            return None;
        }
        let function = descriptor.function_name.as_deref()?;
        let Some(handler) = self.registry.get(function) else {
            debug!(target: "dispatch", function, "No handler registered");
            return None;
        };

        match handler
            .handle_erased(descriptor.arguments_json(), ctx)
            .await
        {
            Ok(output) => Some(output),
            Err(err) => Some(HandlerOutput::markup(invalid_params_fragment(
                &err,
                &descriptor.to_source(),
            ))),
        }
    }
}

fn error_fragment(kind_name: &str, message: &str, source: &str) -> Markup {
    Markup::div()
        .class(CLASS_ERROR)
        .attr("data-error-kind", kind_name)
        .child(
            Markup::element("p")
                .class("artifact-error-message")
                .text(message),
        )
        .child(Markup::element("pre").class("artifact-source").text(source))
}

fn invalid_params_fragment(err: &HandlerError, source: &str) -> Markup {
    error_fragment("invalid-params", &err.to_string(), source)
}

/// Error fragment for a whole tool call that could not be interpreted.
pub fn failure_fragment(err: &RenderError, source: &str) -> Markup {
    error_fragment(err.kind_name(), &err.to_string(), source)
}

fn write_tree(node: &AstNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.node_type);
    if let Some(token) = node.raw_token()
        && !node.node_type.contains('(')
    {
        out.push_str(&format!(" `{token}`"));
    }
    out.push('\n');
    for child in &node.children {
        write_tree(child, depth + 1, out);
    }
}

/// Generic display of a statement that is not a recognized tool call.
pub fn tree_view(node: &AstNode, source: &str) -> Markup {
    let mut tree = String::new();
    write_tree(node, 0, &mut tree);
    Markup::div()
        .class(TREE_VIEW_CLASS)
        .child(Markup::element("pre").class("ast-tree").text(&tree))
        .child(Markup::element("pre").class("tool-source").text(source))
}
