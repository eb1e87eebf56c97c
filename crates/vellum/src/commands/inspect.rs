use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use vellum_tools::ast::normalize;
use vellum_tools::{AstNode, interpret_program};

use super::{Command, read_input};
use crate::error::Error;

pub struct InspectCommand {
    pub path: PathBuf,
    pub namespace: String,
}

#[async_trait]
impl Command for InspectCommand {
    async fn execute(&self) -> Result<()> {
        let source = read_input(&self.path)?;
        let report = describe(&source, &self.namespace)?;

        let mut stdout = std::io::stdout();
        for line in report {
            writeln!(stdout, "{line}")?;
        }
        Ok(())
    }
}

/// One entry per statement: the descriptor as JSON, or a note saying why
/// the statement would not be dispatched.
pub fn describe(source: &str, namespace: &str) -> std::result::Result<Vec<String>, Error> {
    let mut tree = AstNode::from_json(source).map_err(|e| Error::Input(e.to_string()))?;
    normalize(&mut tree);

    let mut report = Vec::new();
    for (index, (statement, descriptor)) in interpret_program(&tree).into_iter().enumerate() {
        let entry = match descriptor {
            Some(call) if call.api_name.as_deref() == Some(namespace) => {
                serde_json::to_string_pretty(&call)?
            }
            Some(call) => format!(
                "not dispatched: `{}` is outside the `{namespace}` namespace",
                call.to_source()
            ),
            None => format!("not a tool call: {}", statement.node_type),
        };
        report.push(format!("[{index}] {entry}"));
    }
    Ok(report)
}
