use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use vellum_core::preferences::Preferences;

use super::Command;
use crate::error::Error;

pub struct PreferencesCommand {
    pub action: PreferencesAction,
    /// Preferences file; the per-user config path when `None`.
    pub path: Option<PathBuf>,
}

pub enum PreferencesAction {
    Show,
    Reset,
}

#[async_trait]
impl Command for PreferencesCommand {
    async fn execute(&self) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Preferences::config_path().map_err(Error::from)?,
        };
        let mut stdout = std::io::stdout();
        let report = match &self.action {
            PreferencesAction::Show => show(&path)?,
            PreferencesAction::Reset => reset(&path)?,
        };
        writeln!(stdout, "{report}")?;
        Ok(())
    }
}

/// The file location followed by the effective preferences as TOML.
pub fn show(path: &Path) -> std::result::Result<String, Error> {
    let prefs = Preferences::load_from(path)?;
    Ok(format!(
        "Preferences file: {}\n\n{}",
        path.display(),
        toml::to_string_pretty(&prefs)?
    ))
}

pub fn reset(path: &Path) -> std::result::Result<String, Error> {
    Preferences::default().save_to(path)?;
    Ok(format!("Preferences reset to defaults at {}", path.display()))
}
