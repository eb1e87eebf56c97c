use std::collections::HashMap;

use vellum_tools::ToolSchema;

use super::{
    ArtifactHandlerErased, ButtonHandler, ComputeHandler, KatexHandler, MermaidHandler,
    PintoraHandler, SandboxHandler, TypstHandler,
};

/// Handlers by function name. Adding a tool means registering it here;
/// the dispatcher never changes.
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn ArtifactHandlerErased>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(MermaidHandler::new());
        registry.register(PintoraHandler::new());
        registry.register(TypstHandler::new());
        registry.register(KatexHandler::new());
        registry.register(ComputeHandler);
        registry.register(SandboxHandler);
        registry.register(ButtonHandler);
        registry
    }

    pub fn register<T: ArtifactHandlerErased + 'static>(&mut self, handler: T) {
        self.handlers
            .insert(handler.name().to_string(), Box::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ArtifactHandlerErased> {
        self.handlers.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name).map(|h| h.schema()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_tools::ArtifactKind;

    #[test]
    fn builtin_table() {
        let registry = HandlerRegistry::with_builtin();
        assert_eq!(
            registry.names(),
            vec![
                "html_render",
                "interactive_button",
                "katex_render",
                "mermaid_render",
                "pintora_render",
                "typst_render",
                "wolfram_alpha_compute",
            ]
        );
        assert_eq!(registry.get("katex_render").map(|h| h.kind()), Some(ArtifactKind::Math));
        assert_eq!(registry.get("pintora_render").map(|h| h.kind()), Some(ArtifactKind::Chart));
        assert_eq!(registry.get("typst_render").map(|h| h.kind()), Some(ArtifactKind::Typeset));
        assert!(registry.get("send_image").is_none());
    }
}
