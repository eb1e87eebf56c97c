use async_trait::async_trait;
use vellum_tools::AstNode;

use super::{BackendError, ParserBackend, Result};

/// Accepts source that is already a serialized parse tree.
///
/// Used where the real parser runs out of process and hands over its JSON
/// output, as the CLI does.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonAstParser;

#[async_trait]
impl ParserBackend for JsonAstParser {
    async fn parse_code(&self, source: &str) -> Result<AstNode> {
        AstNode::from_json(source).map_err(|e| BackendError::Rejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_tree_json() {
        let json = r#"{"node_type":"Expressions","start_token":null,"end_token":null,"children":[]}"#;
        let node = JsonAstParser.parse_code(json).await.unwrap();
        assert_eq!(node.node_type, "Expressions");
    }

    #[tokio::test]
    async fn rejects_plain_source() {
        let err = JsonAstParser
            .parse_code("default_api.mermaid_render()")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }
}
