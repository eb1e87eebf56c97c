pub mod ast;
pub mod blocks;
pub mod call;
pub mod error;
pub mod interpreter;
pub mod kind;
pub mod schema;
pub mod tools;

pub use ast::{AstNode, NodeTag, Token};
pub use call::{ArgValue, Arguments, CallDescriptor};
pub use error::ToolError;
pub use interpreter::{interpret_program, parse_call, parse_call_json};
pub use kind::ArtifactKind;
pub use schema::{ArtifactSpec, InputSchema, ToolSchema, ToolSpec};
