use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backends::ComputeFormat;
use crate::backends::wolfram::DEFAULT_ENDPOINT;
use crate::render::EngineSettings;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Preferences {
    #[serde(default)]
    pub render: RenderPreferences,

    #[serde(default)]
    pub dispatch: DispatchPreferences,

    #[serde(default)]
    pub compute: ComputePreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderPreferences {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Retry budget of the sweep that follows the end of streaming.
    #[serde(default = "default_completion_max_retries")]
    pub completion_max_retries: u32,
    #[serde(default = "default_confirm_sweep_delay_ms")]
    pub confirm_sweep_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchPreferences {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputePreferences {
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub format: ComputeFormat,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_completion_max_retries() -> u32 {
    5
}

fn default_confirm_sweep_delay_ms() -> u64 {
    500
}

fn default_namespace() -> String {
    vellum_tools::tools::DEFAULT_NAMESPACE.to_string()
}

fn default_cache_limit() -> usize {
    100
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for RenderPreferences {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            completion_max_retries: default_completion_max_retries(),
            confirm_sweep_delay_ms: default_confirm_sweep_delay_ms(),
        }
    }
}

impl RenderPreferences {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn confirm_sweep_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_sweep_delay_ms)
    }
}

impl Default for DispatchPreferences {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl Default for ComputePreferences {
    fn default() -> Self {
        Self {
            cache_limit: default_cache_limit(),
            endpoint: default_endpoint(),
            format: ComputeFormat::default(),
        }
    }
}

impl Preferences {
    /// Get the path to the preferences file
    pub fn config_path() -> Result<PathBuf, crate::error::Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            crate::error::Error::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("vellum").join("preferences.toml"))
    }

    /// Load preferences from disk, or return defaults if not found
    pub fn load() -> Result<Self, crate::error::Error> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, crate::error::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse preferences file at {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self) -> Result<(), crate::error::Error> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), crate::error::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            crate::error::Error::Configuration(format!("Failed to serialize preferences: {e}"))
        })?;

        std::fs::write(path, contents)?;

        Ok(())
    }
}
