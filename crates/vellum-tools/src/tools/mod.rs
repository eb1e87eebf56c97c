pub mod button;
pub mod compute;
pub mod diagram;
pub mod sandbox;
pub mod typeset;

pub use button::{INTERACTIVE_BUTTON_TOOL_NAME, InteractiveButtonSpec};
pub use compute::{WOLFRAM_ALPHA_COMPUTE_TOOL_NAME, WolframAlphaComputeSpec};
pub use diagram::{MERMAID_RENDER_TOOL_NAME, MermaidRenderSpec, PINTORA_RENDER_TOOL_NAME, PintoraRenderSpec};
pub use sandbox::{HTML_RENDER_TOOL_NAME, HtmlRenderSpec};
pub use typeset::{KATEX_RENDER_TOOL_NAME, KatexRenderSpec, TYPST_RENDER_TOOL_NAME, TypstRenderSpec};

/// The namespace every recognized tool call is addressed through.
pub const DEFAULT_NAMESPACE: &str = "default_api";
