//! Generation provider implementations

pub mod gemini;
pub mod mock;

use crate::provider::ImageProvider;
use restyle_core::{RestyleConfig, RestyleError, Result};
use std::sync::Arc;

pub use gemini::GeminiProvider;
pub use mock::{MockProvider, ScriptStep};

/// Create a provider by name
pub fn create_provider(name: &str, config: &RestyleConfig) -> Result<Arc<dyn ImageProvider>> {
    match name {
        "gemini" => Ok(Arc::new(GeminiProvider::from_config(config)?)),
        "mock" => Ok(Arc::new(MockProvider::new())),
        _ => Err(RestyleError::Config(format!(
            "Unknown provider: {}",
            name
        ))),
    }
}
