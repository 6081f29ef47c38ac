//! CLI command implementations

pub mod config;
pub mod generate;
pub mod review;
pub mod run;
pub mod scan;

use anyhow::Result;
use restyle_core::RestyleConfig;
use restyle_gen::{create_provider, GenerationClient};
use restyle_index::IndexStore;
use std::sync::Arc;

pub(crate) fn open_store(config: &RestyleConfig) -> Result<Arc<IndexStore>> {
    Ok(Arc::new(IndexStore::open(config.index_file())?))
}

pub(crate) fn build_client(
    config: &RestyleConfig,
    provider: Option<&str>,
) -> Result<Arc<GenerationClient>> {
    let name = provider.unwrap_or("gemini");
    if name != "mock" {
        config.require_api_key()?;
    }
    let provider = create_provider(name, config)?;
    Ok(Arc::new(GenerationClient::new(
        provider,
        config.generation.variation_count,
    )))
}
