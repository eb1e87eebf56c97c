use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use vellum_tools::blocks::{MessageSegment, split_message};

use super::{Command, read_input};

pub struct BlocksCommand {
    pub path: PathBuf,
    pub partial: bool,
}

#[async_trait]
impl Command for BlocksCommand {
    async fn execute(&self) -> Result<()> {
        let message = read_input(&self.path)?;
        let mut stdout = std::io::stdout();

        let blocks = list_blocks(&message, self.partial);
        if blocks.is_empty() {
            writeln!(stdout, "No tool_code blocks found")?;
        }
        for (index, (partial, code)) in blocks.iter().enumerate() {
            let suffix = if *partial { " (unterminated)" } else { "" };
            writeln!(stdout, "--- block {}{suffix} ---", index + 1)?;
            writeln!(stdout, "{code}")?;
        }
        Ok(())
    }
}

/// `(is_partial, code)` for each block in message order.
pub fn list_blocks(message: &str, include_partial: bool) -> Vec<(bool, String)> {
    split_message(message)
        .into_iter()
        .filter_map(|segment| match segment {
            MessageSegment::ToolCode(code) => Some((false, code)),
            MessageSegment::PartialToolCode(code) if include_partial => Some((true, code)),
            _ => None,
        })
        .collect()
}
