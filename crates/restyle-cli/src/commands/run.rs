//! Batch run command

use anyhow::Result;
use restyle_core::RestyleConfig;
use restyle_engine::{BatchOptions, BatchOrchestrator};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn run(
    folder: &str,
    prompt: Option<&str>,
    provider: Option<&str>,
    item_delay_ms: Option<u64>,
) -> Result<()> {
    let config = RestyleConfig::load()?;
    let source = PathBuf::from(folder);
    anyhow::ensure!(source.is_dir(), "Not a directory: {}", source.display());

    let store = super::open_store(&config)?;
    let client = super::build_client(&config, provider)?;

    let mut options = BatchOptions::from_config(&config);
    if let Some(p) = prompt {
        options.prompt = p.to_string();
    }
    if let Some(delay) = item_delay_ms {
        options.item_delay_ms = delay;
    }
    anyhow::ensure!(
        !options.prompt.is_empty(),
        "No prompt given; pass --prompt or set generation.prompt in the config"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            eprintln!("\nStopping after the current item...");
            cancel.store(true, Ordering::Relaxed);
        })?;
    }

    let orchestrator = BatchOrchestrator::new(store, client, options);
    let mut was_cooling = false;
    let outcome = orchestrator.run(&source, &cancel, |progress| {
        if progress.cooling_down {
            if !was_cooling {
                println!("Rate limited, cooling down...");
            }
            was_cooling = true;
            return;
        }
        was_cooling = false;
        println!(
            "[{}/{}] {} processed, {} failed",
            progress.current, progress.total, progress.processed, progress.failed
        );
    })?;

    println!(
        "Done: {} processed, {} failed, {} already up to date{}",
        outcome.processed,
        outcome.failed.len(),
        outcome.skipped_done,
        if outcome.cancelled { " (cancelled)" } else { "" }
    );
    for failure in &outcome.failed {
        println!("  failed {}: {}", failure.rel_path, failure.message);
    }
    anyhow::ensure!(
        outcome.failed.is_empty(),
        "{} item(s) failed",
        outcome.failed.len()
    );
    Ok(())
}
