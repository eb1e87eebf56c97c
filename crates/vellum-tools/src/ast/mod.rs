//! Parse trees produced by the external source parser.
//!
//! The parser backend serializes every node as
//! `{"node_type", "start_token", "end_token", "children"}` where `node_type`
//! is the `Debug` rendering of the parser's node enum. Literal-carrying tags
//! embed their value, e.g. `Variable("default_api")` or `String("graph TD")`.

mod normalize;
mod tag;

pub use normalize::normalize;
pub use tag::NodeTag;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    #[serde(rename = "type", default)]
    pub token_type: String,
    #[serde(default)]
    pub origin_token: String,
    #[serde(default)]
    pub position: usize,
}

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            origin_token: token.clone(),
            token,
            token_type: String::new(),
            position: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub node_type: String,
    #[serde(default)]
    pub start_token: Option<Token>,
    #[serde(default)]
    pub end_token: Option<Token>,
    #[serde(default)]
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            start_token: None,
            end_token: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = Token::new(token);
        self.end_token = Some(token.clone());
        self.start_token = Some(token);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ToolError> {
        serde_json::from_str(json).map_err(|e| ToolError::MalformedAst(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> String {
        match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(err) => format!("{{\"error\": \"failed to serialize parse tree: {err}\"}}"),
        }
    }

    pub fn tag(&self) -> NodeTag {
        NodeTag::parse(&self.node_type)
    }

    /// Source text of the leaf token, preferring the untouched original.
    pub fn raw_token(&self) -> Option<&str> {
        let token = self.start_token.as_ref()?;
        if token.origin_token.is_empty() {
            Some(token.token.as_str())
        } else {
            Some(token.origin_token.as_str())
        }
    }

    pub fn child(&self, index: usize) -> Option<&AstNode> {
        self.children.get(index)
    }
}
