//! Sequential batch driver
//!
//! Processes the pending items of one folder scan, one file at a time. The
//! only concurrency is the per-item fan-out inside the generation client;
//! keeping items sequential bounds the load on the external service. A fixed
//! delay separates items, and rate-limit rejections trigger a longer cooldown
//! instead of aborting the run.

use restyle_core::{is_rate_limited, now_unix, sibling_with_suffix, RestyleConfig, Result};
use restyle_gen::{extension_for_mime, mime_for_path, GenerationClient};
use restyle_index::{scan_folder, FileRecord, IndexStore, ScanItem};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_suffix: String,
    pub selection_suffix: String,
    pub prompt: String,
    pub size_class: String,
    pub item_delay_ms: u64,
    pub cooldown_ms: u64,
}

impl BatchOptions {
    pub fn from_config(config: &RestyleConfig) -> Self {
        Self {
            output_suffix: config.layout.output_suffix.clone(),
            selection_suffix: config.layout.selection_suffix.clone(),
            prompt: config.generation.prompt.clone(),
            size_class: config.generation.size_class.clone(),
            item_delay_ms: config.generation.item_delay_ms,
            cooldown_ms: config.generation.cooldown_ms,
        }
    }
}

/// Counters exposed after every processed item
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    /// 1-based index of the item just finished
    pub current: usize,
    /// Number of pending items this run started with
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub pending: usize,
    /// True while the driver sits out a rate-limit cooldown
    pub cooling_down: bool,
}

/// One recorded per-file failure
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub rel_path: String,
    pub message: String,
}

/// Result of a whole batch run
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub total: usize,
    pub processed: usize,
    pub failed: Vec<ItemFailure>,
    /// Items the scan classified as already done
    pub skipped_done: usize,
    pub cancelled: bool,
}

/// Drives one sequential pass over a folder's pending files
pub struct BatchOrchestrator {
    store: Arc<IndexStore>,
    client: Arc<GenerationClient>,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<IndexStore>, client: Arc<GenerationClient>, options: BatchOptions) -> Self {
        Self {
            store,
            client,
            options,
        }
    }

    /// Run one pass over `source`. A single file's failure is recorded and
    /// never aborts the run; cancellation is checked between items.
    pub fn run(
        &self,
        source: &Path,
        cancel: &AtomicBool,
        mut on_progress: impl FnMut(&BatchProgress),
    ) -> Result<BatchOutcome> {
        let processed_root = sibling_with_suffix(source, &self.options.output_suffix);
        let selection_root = sibling_with_suffix(source, &self.options.selection_suffix);
        let report = scan_folder(&self.store, source, &processed_root, &selection_root)?;

        let pending: Vec<&ScanItem> = report.items.iter().filter(|i| i.pending).collect();
        let mut outcome = BatchOutcome {
            total: pending.len(),
            skipped_done: report.done,
            ..Default::default()
        };
        let mut progress = BatchProgress {
            total: pending.len(),
            pending: pending.len(),
            ..Default::default()
        };
        tracing::info!(
            total = report.total,
            pending = report.pending,
            done = report.done,
            "starting batch run"
        );

        for (idx, item) in pending.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                outcome.cancelled = true;
                break;
            }
            if idx > 0 && self.options.item_delay_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.options.item_delay_ms));
            }
            progress.current = idx + 1;
            progress.cooling_down = false;

            match self.process_item(item, &processed_root) {
                Ok(()) => {
                    outcome.processed += 1;
                    progress.processed += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(
                        item = %item.rel_path,
                        index = idx + 1,
                        total = outcome.total,
                        error = %message,
                        "item failed"
                    );
                    outcome.failed.push(ItemFailure {
                        rel_path: item.rel_path.clone(),
                        message: message.clone(),
                    });
                    progress.failed += 1;
                    if is_rate_limited(&message) {
                        tracing::info!(
                            cooldown_ms = self.options.cooldown_ms,
                            "rate limit detected, cooling down before continuing"
                        );
                        progress.cooling_down = true;
                        progress.pending = outcome.total - progress.processed - progress.failed;
                        on_progress(&progress);
                        std::thread::sleep(Duration::from_millis(self.options.cooldown_ms));
                        progress.cooling_down = false;
                    }
                }
            }
            progress.pending = outcome.total - progress.processed - progress.failed;
            on_progress(&progress);
        }

        tracing::info!(
            processed = outcome.processed,
            failed = outcome.failed.len(),
            cancelled = outcome.cancelled,
            "batch run finished"
        );
        Ok(outcome)
    }

    fn process_item(&self, item: &ScanItem, processed_root: &Path) -> Result<()> {
        let bytes = std::fs::read(&item.abs_path)?;
        let mime = mime_for_path(&item.abs_path);
        let images = self.client.generate_variations(
            &bytes,
            mime,
            &self.options.prompt,
            &self.options.size_class,
        )?;

        // Each source file gets a subfolder of numbered variation files,
        // mirroring its relative location
        let rel = Path::new(&item.rel_path);
        let stem = rel
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("item");
        let item_dir_rel = rel.parent().unwrap_or(Path::new("")).join(stem);
        let item_dir = processed_root.join(&item_dir_rel);
        std::fs::create_dir_all(&item_dir)?;
        let rel_prefix = item_dir_rel.to_string_lossy().replace('\\', "/");

        let mut outputs = Vec::new();
        for (i, image) in images.iter().enumerate() {
            let name = format!("{:03}.{}", i + 1, extension_for_mime(&image.mime));
            std::fs::write(item_dir.join(&name), &image.bytes)?;
            outputs.push(format!("{}/{}", rel_prefix, name));
        }

        self.store.upsert_file(
            processed_root,
            FileRecord {
                rel_path: item.rel_path.clone(),
                size: item.size,
                modified_unix: item.modified_unix,
                outputs,
                processed_unix: now_unix(),
            },
        )
    }
}
