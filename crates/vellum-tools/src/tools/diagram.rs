use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;
use crate::schema::{ArtifactSpec, ToolSpec};

pub const MERMAID_RENDER_TOOL_NAME: &str = "mermaid_render";
pub const PINTORA_RENDER_TOOL_NAME: &str = "pintora_render";

pub struct MermaidRenderSpec;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MermaidRenderParams {
    /// Mermaid source, e.g. a flowchart or sequence diagram
    pub mermaid_code: String,
}

impl ToolSpec for MermaidRenderSpec {
    type Params = MermaidRenderParams;

    const NAME: &'static str = MERMAID_RENDER_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Mermaid diagram";
    const DESCRIPTION: &'static str = "Draw flowcharts, sequence diagrams, mind maps and other diagrams written in Mermaid syntax";
    const KIND: ArtifactKind = ArtifactKind::Mermaid;
    const EXAMPLE: &'static str = r#"mermaid_code="graph TD; A-->B""#;
}

impl ArtifactSpec for MermaidRenderSpec {
    fn source(params: &Self::Params) -> &str {
        &params.mermaid_code
    }
}

pub struct PintoraRenderSpec;

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PintoraRenderParams {
    /// Pintora source, e.g. a sequence, ER or activity diagram
    pub diagram: String,
    /// Display scale of the rendered diagram
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl ToolSpec for PintoraRenderSpec {
    type Params = PintoraRenderParams;

    const NAME: &'static str = PINTORA_RENDER_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Pintora diagram";
    const DESCRIPTION: &'static str =
        "Draw sequence, entity-relationship, activity and mind map diagrams written in Pintora syntax";
    const KIND: ArtifactKind = ArtifactKind::Chart;
    const EXAMPLE: &'static str = r#"diagram="sequenceDiagram\n  User->>App: hello", scale=1"#;
}

impl ArtifactSpec for PintoraRenderSpec {
    fn source(params: &Self::Params) -> &str {
        &params.diagram
    }

    fn scale(params: &Self::Params) -> Option<f64> {
        Some(params.scale)
    }
}
