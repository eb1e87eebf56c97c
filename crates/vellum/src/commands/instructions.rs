use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use vellum_core::handlers::HandlerRegistry;
use vellum_core::handlers::instructions::tool_instructions;

use super::Command;

pub struct InstructionsCommand {
    pub namespace: String,
}

#[async_trait]
impl Command for InstructionsCommand {
    async fn execute(&self) -> Result<()> {
        let registry = HandlerRegistry::with_builtin();
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", tool_instructions(&registry, &self.namespace))?;
        Ok(())
    }
}
