//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `RESTYLE_API_KEY`, `RESTYLE_API_URL`
//! 2. Project-local: `.restyle/config.toml`
//! 3. Global: `~/.restyle/config.toml`

use crate::error::{RestyleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generation service credentials and endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

/// Generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of variations requested per source image
    #[serde(default = "default_variation_count")]
    pub variation_count: usize,
    /// Attempt ceiling for transient network failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Base delay for the linear retry backoff, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Fixed delay between batch items, in milliseconds
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
    /// Cooldown applied after a rate-limit rejection, in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Target size class sent to the service (e.g. "1K", "2K")
    #[serde(default = "default_size_class")]
    pub size_class: String,
    /// Default instruction text when none is supplied per call
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_variation_count() -> usize {
    4
}
fn default_max_attempts() -> usize {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_item_delay_ms() -> u64 {
    2000
}
fn default_cooldown_ms() -> u64 {
    60_000
}
fn default_size_class() -> String {
    "1K".to_string()
}
fn default_prompt() -> String {
    "Restyle this image while preserving its composition".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            variation_count: default_variation_count(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            item_delay_ms: default_item_delay_ms(),
            cooldown_ms: default_cooldown_ms(),
            size_class: default_size_class(),
            prompt: default_prompt(),
        }
    }
}

/// On-disk layout of generated outputs and the index file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Suffix appended to a source folder's name for batch outputs
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
    /// Suffix appended to a source folder's name for review selections
    #[serde(default = "default_selection_suffix")]
    pub selection_suffix: String,
    /// Index file location; defaults to `~/.restyle/index.txt`
    #[serde(default)]
    pub index_file: Option<PathBuf>,
}

fn default_output_suffix() -> String {
    "_restyled".to_string()
}
fn default_selection_suffix() -> String {
    "_selected".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            output_suffix: default_output_suffix(),
            selection_suffix: default_selection_suffix(),
            index_file: None,
        }
    }
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestyleConfigFile {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct RestyleConfig {
    pub service: ServiceConfig,
    pub generation: GenerationConfig,
    pub layout: LayoutConfig,
}

impl RestyleConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = RestyleConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(".restyle/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config);

        Ok(RestyleConfig {
            service: config.service,
            generation: config.generation,
            layout: config.layout,
        })
    }

    /// Load config from a specific file path only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(RestyleConfig {
            service: config.service,
            generation: config.generation,
            layout: config.layout,
        })
    }

    /// API key, or a configuration error naming how to set one
    pub fn require_api_key(&self) -> Result<&str> {
        self.service.api_key.as_deref().ok_or_else(|| {
            RestyleError::Config(
                "API key not configured. Set RESTYLE_API_KEY or add it to .restyle/config.toml"
                    .to_string(),
            )
        })
    }

    /// Resolved index file path
    pub fn index_file(&self) -> PathBuf {
        if let Some(path) = &self.layout.index_file {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".restyle")
            .join("index.txt")
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".restyle").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<RestyleConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: RestyleConfigFile = toml::from_str(&content).map_err(|e| {
            RestyleError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    fn merge_into(base: &mut RestyleConfigFile, overlay: RestyleConfigFile) {
        if overlay.service.api_key.is_some() {
            base.service.api_key = overlay.service.api_key;
        }
        if overlay.service.api_url.is_some() {
            base.service.api_url = overlay.service.api_url;
        }
        if overlay.service.model != default_model() {
            base.service.model = overlay.service.model;
        }
        if overlay.generation.variation_count != default_variation_count() {
            base.generation.variation_count = overlay.generation.variation_count;
        }
        if overlay.generation.max_attempts != default_max_attempts() {
            base.generation.max_attempts = overlay.generation.max_attempts;
        }
        if overlay.generation.retry_base_delay_ms != default_retry_base_delay_ms() {
            base.generation.retry_base_delay_ms = overlay.generation.retry_base_delay_ms;
        }
        if overlay.generation.item_delay_ms != default_item_delay_ms() {
            base.generation.item_delay_ms = overlay.generation.item_delay_ms;
        }
        if overlay.generation.cooldown_ms != default_cooldown_ms() {
            base.generation.cooldown_ms = overlay.generation.cooldown_ms;
        }
        if overlay.generation.size_class != default_size_class() {
            base.generation.size_class = overlay.generation.size_class;
        }
        if overlay.generation.prompt != default_prompt() {
            base.generation.prompt = overlay.generation.prompt;
        }
        if overlay.layout.output_suffix != default_output_suffix() {
            base.layout.output_suffix = overlay.layout.output_suffix;
        }
        if overlay.layout.selection_suffix != default_selection_suffix() {
            base.layout.selection_suffix = overlay.layout.selection_suffix;
        }
        if overlay.layout.index_file.is_some() {
            base.layout.index_file = overlay.layout.index_file;
        }
    }

    fn apply_env_overrides(config: &mut RestyleConfigFile) {
        if let Ok(key) = std::env::var("RESTYLE_API_KEY") {
            config.service.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RESTYLE_API_URL") {
            config.service.api_url = Some(url);
        }
    }
}
