//! Review commands

use anyhow::Result;
use clap::Subcommand;
use restyle_core::{normalize_rel_key, RestyleConfig};
use restyle_engine::{ReviewOptions, ReviewWorkflowEngine};
use std::path::Path;
use std::time::Duration;

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// List variation sets and their review state
    List {
        /// Processed folder (the source folder's output sibling)
        folder: String,
    },

    /// Commit a selection for one item
    Select {
        /// Processed folder
        folder: String,

        /// Item path relative to the source folder
        item: String,

        /// 1-based variation number to keep
        choice: usize,

        /// Reviewer notes stored with the selection
        #[arg(long, default_value = "")]
        notes: String,

        /// Mark the selection as needing a transparent background
        #[arg(long)]
        transparent: bool,
    },

    /// Regenerate an item's variations, discarding any prior selection
    Redo {
        /// Processed folder
        folder: String,

        /// Item path relative to the source folder
        item: String,

        /// Replacement prompt (overrides the configured default)
        #[arg(long, short)]
        prompt: Option<String>,

        /// Provider to use (gemini, mock)
        #[arg(long)]
        provider: Option<String>,
    },
}

pub fn run(cmd: ReviewCommands) -> Result<()> {
    match cmd {
        ReviewCommands::List { folder } => run_list(&folder),
        ReviewCommands::Select {
            folder,
            item,
            choice,
            notes,
            transparent,
        } => run_select(&folder, &item, choice, &notes, transparent),
        ReviewCommands::Redo {
            folder,
            item,
            prompt,
            provider,
        } => run_redo(&folder, &item, prompt.as_deref(), provider.as_deref()),
    }
}

fn load_engine(
    config: &RestyleConfig,
    folder: &Path,
    provider: Option<&str>,
) -> Result<ReviewWorkflowEngine> {
    anyhow::ensure!(folder.is_dir(), "Not a directory: {}", folder.display());
    let store = super::open_store(config)?;
    let client = super::build_client(config, provider)?;
    let engine = ReviewWorkflowEngine::new(store, client, ReviewOptions::from_config(config));
    engine.load_folder(folder)?;
    Ok(engine)
}

fn find_item(engine: &ReviewWorkflowEngine, rel: &str) -> Result<usize> {
    let key = normalize_rel_key(rel);
    engine
        .items()
        .iter()
        .position(|i| i.key == key)
        .ok_or_else(|| anyhow::anyhow!("No variation set for '{}'", rel))
}

fn run_list(folder: &str) -> Result<()> {
    let config = RestyleConfig::load()?;
    let processed = Path::new(folder);
    // Listing never generates, so the offline provider avoids requiring a key
    let engine = load_engine(&config, processed, Some("mock"))?;
    let items = engine.items();
    if items.is_empty() {
        println!("No variation sets under {}", processed.display());
        return Ok(());
    }
    for (i, item) in items.iter().enumerate() {
        let marker = if engine.cursor() == Some(i) { ">" } else { " " };
        let state = match item.selected_index {
            Some(n) => format!("selected #{}", n),
            None => "pending".to_string(),
        };
        println!(
            "{} {} ({} variations, {})",
            marker,
            item.rel_path,
            item.variations.len(),
            state
        );
    }
    Ok(())
}

fn run_select(folder: &str, item: &str, choice: usize, notes: &str, transparent: bool) -> Result<()> {
    let config = RestyleConfig::load()?;
    let processed = Path::new(folder);
    let engine = load_engine(&config, processed, Some("mock"))?;
    let index = find_item(&engine, item)?;
    engine.commit_selection(index, choice, notes, transparent)?;

    let items = engine.items();
    println!(
        "Selected variation {} of {} -> {}",
        choice,
        items[index].rel_path,
        items[index].selected_output.as_deref().unwrap_or("")
    );
    match engine.cursor() {
        Some(next) => println!("Next pending: {}", items[next].rel_path),
        None => println!("All items reviewed"),
    }
    Ok(())
}

fn run_redo(folder: &str, item: &str, prompt: Option<&str>, provider: Option<&str>) -> Result<()> {
    let config = RestyleConfig::load()?;
    let processed = Path::new(folder);
    let engine = load_engine(&config, processed, provider)?;
    let index = find_item(&engine, item)?;

    let prompt = prompt.unwrap_or(&config.generation.prompt);
    anyhow::ensure!(
        !prompt.is_empty(),
        "No prompt given; pass --prompt or set generation.prompt in the config"
    );

    engine.request_redo(index, prompt)?;
    println!("Regenerating {}...", item);
    while !engine.redo_idle() {
        std::thread::sleep(Duration::from_millis(100));
    }

    let refreshed = &engine.items()[index];
    anyhow::ensure!(
        !refreshed.variations.is_empty(),
        "Regeneration produced no variations for '{}'",
        item
    );
    println!(
        "Wrote {} variations under {}",
        refreshed.variations.len(),
        refreshed.variation_dir.display()
    );
    Ok(())
}
