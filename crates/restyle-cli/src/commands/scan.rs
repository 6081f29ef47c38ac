//! Scan command

use anyhow::Result;
use restyle_core::{sibling_with_suffix, RestyleConfig};
use restyle_index::scan_folder;
use std::path::PathBuf;

pub fn run(folder: &str, verbose: bool) -> Result<()> {
    let config = RestyleConfig::load()?;
    let source = PathBuf::from(folder);
    anyhow::ensure!(source.is_dir(), "Not a directory: {}", source.display());

    let store = super::open_store(&config)?;
    let processed = sibling_with_suffix(&source, &config.layout.output_suffix);
    let selection = sibling_with_suffix(&source, &config.layout.selection_suffix);
    let report = scan_folder(&store, &source, &processed, &selection)?;

    println!("Scanned {}", source.display());
    println!("  total:   {}", report.total);
    println!("  pending: {}", report.pending);
    println!("  done:    {}", report.done);
    if verbose {
        for item in &report.items {
            let state = if item.pending { "pending" } else { "done   " };
            println!("  {} {}", state, item.rel_path);
        }
    }
    Ok(())
}
