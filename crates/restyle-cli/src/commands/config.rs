//! Configuration commands

use anyhow::Result;
use clap::Subcommand;
use restyle_core::RestyleConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
}

pub fn run(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(),
    }
}

fn run_show() -> Result<()> {
    let config = RestyleConfig::load()?;
    let key = match config.service.api_key.as_deref() {
        Some(k) if k.chars().count() > 8 => {
            format!("{}...", k.chars().take(8).collect::<String>())
        }
        Some(_) => "(set)".to_string(),
        None => "(not set)".to_string(),
    };
    println!("service.api_key                = {}", key);
    println!(
        "service.api_url                = {}",
        config.service.api_url.as_deref().unwrap_or("(default)")
    );
    println!("service.model                  = {}", config.service.model);
    println!(
        "generation.variation_count     = {}",
        config.generation.variation_count
    );
    println!(
        "generation.max_attempts        = {}",
        config.generation.max_attempts
    );
    println!(
        "generation.retry_base_delay_ms = {}",
        config.generation.retry_base_delay_ms
    );
    println!(
        "generation.item_delay_ms       = {}",
        config.generation.item_delay_ms
    );
    println!(
        "generation.cooldown_ms         = {}",
        config.generation.cooldown_ms
    );
    println!(
        "generation.size_class          = {}",
        config.generation.size_class
    );
    println!(
        "generation.prompt              = {}",
        config.generation.prompt
    );
    println!(
        "layout.output_suffix           = {}",
        config.layout.output_suffix
    );
    println!(
        "layout.selection_suffix        = {}",
        config.layout.selection_suffix
    );
    println!(
        "layout.index_file              = {}",
        config.index_file().display()
    );
    Ok(())
}
