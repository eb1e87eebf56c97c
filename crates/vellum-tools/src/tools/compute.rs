use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;
use crate::schema::ToolSpec;

pub const WOLFRAM_ALPHA_COMPUTE_TOOL_NAME: &str = "wolfram_alpha_compute";

pub struct WolframAlphaComputeSpec;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WolframAlphaComputeParams {
    /// Natural language or Wolfram Language query
    pub query: String,
    /// Only keep the rendered images of each result pod
    #[serde(default)]
    pub image_only: bool,
    /// Result presentation (`html`, `markdown` or `raw`); the configured
    /// default when absent
    #[serde(default)]
    pub format: Option<String>,
}

impl ToolSpec for WolframAlphaComputeSpec {
    type Params = WolframAlphaComputeParams;

    const NAME: &'static str = WOLFRAM_ALPHA_COMPUTE_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Wolfram|Alpha";
    const DESCRIPTION: &'static str =
        "Compute integrals, solve equations, plot functions and look up scientific data";
    const KIND: ArtifactKind = ArtifactKind::Compute;
    const EXAMPLE: &'static str = r#"query="integrate x^2 sin x dx", image_only=False, format="html""#;
}
