use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;
use crate::schema::{ArtifactSpec, ToolSpec};

pub const TYPST_RENDER_TOOL_NAME: &str = "typst_render";
pub const KATEX_RENDER_TOOL_NAME: &str = "katex_render";

pub struct TypstRenderSpec;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypstRenderParams {
    /// Typst markup for the document
    pub typst_code: String,
}

impl ToolSpec for TypstRenderSpec {
    type Params = TypstRenderParams;

    const NAME: &'static str = TYPST_RENDER_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Typst document";
    const DESCRIPTION: &'static str =
        "Typeset tables, long derivations and structured documents with Typst markup";
    const KIND: ArtifactKind = ArtifactKind::Typeset;
    const EXAMPLE: &'static str = r##"typst_code="#table(columns: 2, [a], [b])""##;
}

impl ArtifactSpec for TypstRenderSpec {
    fn source(params: &Self::Params) -> &str {
        &params.typst_code
    }
}

pub struct KatexRenderSpec;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KatexRenderParams {
    /// LaTeX math for KaTeX, without surrounding dollar signs
    pub katex_code: String,
}

impl ToolSpec for KatexRenderSpec {
    type Params = KatexRenderParams;

    const NAME: &'static str = KATEX_RENDER_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Formula";
    const DESCRIPTION: &'static str = "Display a standalone mathematical formula written in LaTeX";
    const KIND: ArtifactKind = ArtifactKind::Math;
    const EXAMPLE: &'static str = r#"katex_code="\\int_0^1 x^2 \\, dx""#;
}

impl ArtifactSpec for KatexRenderSpec {
    fn source(params: &Self::Params) -> &str {
        &params.katex_code
    }
}
