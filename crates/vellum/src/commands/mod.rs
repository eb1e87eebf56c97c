use async_trait::async_trait;
use eyre::Result;
use std::io::Read;
use std::path::Path;

use crate::error::Error;

pub mod blocks;
pub mod compute;
pub mod inspect;
pub mod instructions;
pub mod preferences;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Reads `path`, or stdin when `path` is `-`.
pub(crate) fn read_input(path: &Path) -> std::result::Result<String, Error> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    Ok(std::fs::read_to_string(path)?)
}
