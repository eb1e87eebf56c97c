use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of artifact a tool call produces.
///
/// The serialized name doubles as the `data-artifact-kind` attribute value
/// and the prefix of placeholder ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ArtifactKind {
    Mermaid,
    Chart,
    Typeset,
    Math,
    Compute,
    Sandbox,
    Button,
}

impl ArtifactKind {
    /// Kinds rendered by a backend sweep (and therefore retried and bound).
    pub const RENDERABLE: [ArtifactKind; 4] = [
        ArtifactKind::Mermaid,
        ArtifactKind::Chart,
        ArtifactKind::Typeset,
        ArtifactKind::Math,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Mermaid => "mermaid",
            ArtifactKind::Chart => "chart",
            ArtifactKind::Typeset => "typeset",
            ArtifactKind::Math => "math",
            ArtifactKind::Compute => "compute",
            ArtifactKind::Sandbox => "sandbox",
            ArtifactKind::Button => "button",
        }
    }

    pub fn is_renderable(&self) -> bool {
        Self::RENDERABLE.contains(self)
    }

    /// Human readable label used in loading and error panels.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Mermaid => "Mermaid diagram",
            ArtifactKind::Chart => "Chart",
            ArtifactKind::Typeset => "Typst document",
            ArtifactKind::Math => "Formula",
            ArtifactKind::Compute => "Wolfram|Alpha result",
            ArtifactKind::Sandbox => "HTML preview",
            ArtifactKind::Button => "Button",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_matches_attribute_value() {
        for kind in ArtifactKind::RENDERABLE {
            assert_eq!(kind.to_string(), kind.as_str());
            assert_eq!(ArtifactKind::from_str(kind.as_str()).ok(), Some(kind));
        }
        assert!(!ArtifactKind::Compute.is_renderable());
    }
}
