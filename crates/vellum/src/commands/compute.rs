use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use tracing::info;
use vellum_core::backends::format::format_results;
use vellum_core::backends::{ComputeBackend, ComputeFormat, WolframAlphaClient};

use super::Command;
use crate::error::Error;

pub struct ComputeCommand {
    pub query: String,
    pub image_only: bool,
    pub format: ComputeFormat,
    pub endpoint: String,
}

#[async_trait]
impl Command for ComputeCommand {
    async fn execute(&self) -> Result<()> {
        let output = self.run(&WolframAlphaClient::new(self.endpoint.clone())).await?;
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{output}")?;
        Ok(())
    }
}

impl ComputeCommand {
    pub async fn run(&self, backend: &dyn ComputeBackend) -> std::result::Result<String, Error> {
        if self.query.trim().is_empty() {
            return Err(Error::Input("query must not be empty".to_string()));
        }
        info!(query = %self.query, image_only = self.image_only, "Running compute query");
        let results = backend.compute(&self.query, self.image_only).await?;
        Ok(format_results(&results, self.format))
    }
}
