//! Review workflow engine
//!
//! A state machine over the variation sets of one processed folder. Items
//! are Pending until a selection is committed, Reviewed afterwards, and drop
//! back to Pending when sent for redo. A linear cursor always points at the
//! next item awaiting review; redo work runs on the background queue in
//! [`crate::redo`].

use crate::redo::{RedoContext, RedoQueue, RedoRequest};
use restyle_core::{
    normalize_rel_key, now_unix, sibling_with_suffix, strip_suffix_sibling, RestyleConfig,
    RestyleError, Result,
};
use restyle_gen::GenerationClient;
use restyle_index::{is_supported, IndexStore, ReviewRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

/// Tuning knobs for the review workflow
#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub output_suffix: String,
    pub selection_suffix: String,
    pub size_class: String,
}

impl ReviewOptions {
    pub fn from_config(config: &RestyleConfig) -> Self {
        Self {
            output_suffix: config.layout.output_suffix.clone(),
            selection_suffix: config.layout.selection_suffix.clone(),
            size_class: config.generation.size_class.clone(),
        }
    }
}

/// Runtime projection of one variation set. Rebuilt fresh from the folder
/// record and the filesystem on every load; never persisted itself.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub rel_path: String,
    pub key: String,
    pub original_path: PathBuf,
    pub variation_dir: PathBuf,
    /// Variation files ordered by numeric suffix, then lexicographically
    pub variations: Vec<PathBuf>,
    pub reviewed: bool,
    /// 1-based committed selection
    pub selected_index: Option<usize>,
    pub notes: String,
    pub transparent: bool,
    /// Committed copy, relative to the selection folder
    pub selected_output: Option<String>,
}

struct Roots {
    source: PathBuf,
    processed: PathBuf,
    selection: PathBuf,
}

/// Drives the human review of a processed folder
pub struct ReviewWorkflowEngine {
    store: Arc<IndexStore>,
    client: Arc<GenerationClient>,
    options: ReviewOptions,
    items: Arc<Mutex<Vec<ReviewItem>>>,
    cursor: Mutex<Option<usize>>,
    roots: Mutex<Option<Roots>>,
    queue: Mutex<Option<RedoQueue>>,
}

impl ReviewWorkflowEngine {
    pub fn new(
        store: Arc<IndexStore>,
        client: Arc<GenerationClient>,
        options: ReviewOptions,
    ) -> Self {
        Self {
            store,
            client,
            options,
            items: Arc::new(Mutex::new(Vec::new())),
            cursor: Mutex::new(None),
            roots: Mutex::new(None),
            queue: Mutex::new(None),
        }
    }

    /// Load a processed folder for review, cancelling any redo work still
    /// queued for the previous folder. Returns the number of review items.
    pub fn load_folder(&self, processed: &Path) -> Result<usize> {
        // Take the old queue out first; the guard must not be held across
        // shutdown() or the worker join can deadlock against request_redo
        let old_queue = self.queue.lock().unwrap().take();
        if let Some(queue) = old_queue {
            queue.shutdown();
        }

        let existing = self.store.folder(processed);
        let source = match &existing {
            Some(record) => PathBuf::from(&record.source_folder),
            None => strip_suffix_sibling(processed, &self.options.output_suffix).ok_or_else(
                || {
                    RestyleError::Index(format!(
                        "Cannot infer source folder for {}",
                        processed.display()
                    ))
                },
            )?,
        };
        let selection = match &existing {
            Some(record) => PathBuf::from(&record.selection_folder),
            None => sibling_with_suffix(&source, &self.options.selection_suffix),
        };
        let folder = self
            .store
            .get_or_create_folder(processed, &source, &selection)?;

        let mut items = Vec::new();
        let mut discovered: HashSet<String> = HashSet::new();
        for entry in WalkDir::new(&source).follow_links(false) {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() || !is_supported(entry.path()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&source)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            if rel.is_empty() {
                continue;
            }
            let key = normalize_rel_key(&rel);
            discovered.insert(key.clone());

            let rel_path = Path::new(&rel);
            let stem = rel_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("item");
            let variation_dir = processed
                .join(rel_path.parent().unwrap_or(Path::new("")))
                .join(stem);
            let variations = list_variations(&variation_dir);
            if variations.is_empty() {
                // Nothing to review; a stale selection for it is void
                if folder.reviews.contains_key(&key) {
                    self.store.remove_review(processed, &rel)?;
                }
                continue;
            }

            let mut item = ReviewItem {
                rel_path: rel,
                key,
                original_path: entry.path().to_path_buf(),
                variation_dir,
                variations,
                reviewed: false,
                selected_index: None,
                notes: String::new(),
                transparent: false,
                selected_output: None,
            };
            if let Some(review) = folder.reviews.get(&item.key) {
                if selection_is_valid(review, item.variations.len(), &selection) {
                    item.reviewed = true;
                    item.selected_index = Some(review.selected_index);
                    item.notes = review.notes.clone();
                    item.transparent = review.transparent;
                    item.selected_output = Some(review.selected_output.clone());
                } else {
                    self.store.remove_review(processed, &item.rel_path)?;
                }
            }
            items.push(item);
        }
        items.sort_by(|a, b| a.key.cmp(&b.key));
        self.store.prune(processed, &discovered)?;

        let count = items.len();
        let first_pending = items.iter().position(|i| !i.reviewed);
        *self.items.lock().unwrap() = items;
        *self.cursor.lock().unwrap() = first_pending;
        *self.roots.lock().unwrap() = Some(Roots {
            source,
            processed: processed.to_path_buf(),
            selection,
        });
        *self.queue.lock().unwrap() = Some(RedoQueue::new(RedoContext {
            store: Arc::clone(&self.store),
            client: Arc::clone(&self.client),
            processed_root: processed.to_path_buf(),
            items: Arc::clone(&self.items),
            cancel: Arc::new(AtomicBool::new(false)),
        }));
        tracing::info!(count, pending = ?first_pending, folder = %processed.display(), "review folder loaded");
        Ok(count)
    }

    /// Snapshot of all items
    pub fn items(&self) -> Vec<ReviewItem> {
        self.items.lock().unwrap().clone()
    }

    /// Index of the item the review cursor points at; None when everything
    /// is reviewed (or nothing is loaded)
    pub fn cursor(&self) -> Option<usize> {
        *self.cursor.lock().unwrap()
    }

    /// Jobs still queued or in flight on the redo queue
    pub fn redo_pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap()
            .as_ref()
            .map(|q| q.pending())
            .unwrap_or(0)
    }

    pub fn redo_idle(&self) -> bool {
        self.queue
            .lock()
            .unwrap()
            .as_ref()
            .map(|q| q.is_idle())
            .unwrap_or(true)
    }

    /// Commit a selection for item `index`: copy the chosen variation into
    /// the selection folder, persist the review record and advance the
    /// cursor to the next pending item. `choice` is 1-based.
    pub fn commit_selection(
        &self,
        index: usize,
        choice: usize,
        notes: &str,
        transparent: bool,
    ) -> Result<Option<usize>> {
        let roots = self.roots.lock().unwrap();
        let roots = roots
            .as_ref()
            .ok_or_else(|| RestyleError::Index("No folder loaded".to_string()))?;

        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(index)
            .ok_or_else(|| RestyleError::Index(format!("Item index out of range: {}", index)))?;
        if choice == 0 || choice > item.variations.len() {
            return Err(RestyleError::Index(format!(
                "Selection {} out of range for {} variations",
                choice,
                item.variations.len()
            )));
        }

        let chosen = item.variations[choice - 1].clone();
        let ext = chosen
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        let rel_path = Path::new(&item.rel_path);
        let stem = rel_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("item");
        let parent = rel_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().replace('\\', "/"));
        let dest_rel = match parent {
            Some(dir) => format!("{}/{}.{}", dir, stem, ext),
            None => format!("{}.{}", stem, ext),
        };
        let dest = roots.selection.join(&dest_rel);
        if let Some(dir) = dest.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(&chosen, &dest)?;

        // Best-effort: losing the sidecar never fails the commit
        if let Err(e) = write_selection_metadata(&dest, choice, notes, transparent) {
            tracing::warn!(file = %dest.display(), error = %e, "failed to write selection metadata");
        }

        self.store.upsert_review(
            &roots.processed,
            ReviewRecord {
                rel_path: item.rel_path.clone(),
                selected_index: choice,
                notes: notes.to_string(),
                transparent,
                selected_output: dest_rel.clone(),
                reviewed_unix: now_unix(),
            },
        )?;

        item.reviewed = true;
        item.selected_index = Some(choice);
        item.notes = notes.to_string();
        item.transparent = transparent;
        item.selected_output = Some(dest_rel);

        let next = next_pending(&items, index);
        *self.cursor.lock().unwrap() = next;
        Ok(next)
    }

    /// Send item `index` back for regeneration: clear its stored selection,
    /// enqueue a redo job and advance immediately without waiting for the
    /// regeneration to finish.
    pub fn request_redo(&self, index: usize, prompt: &str) -> Result<Option<usize>> {
        let roots = self.roots.lock().unwrap();
        let roots = roots
            .as_ref()
            .ok_or_else(|| RestyleError::Index("No folder loaded".to_string()))?;

        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(index)
            .ok_or_else(|| RestyleError::Index(format!("Item index out of range: {}", index)))?;

        item.reviewed = false;
        item.selected_index = None;
        item.notes.clear();
        item.transparent = false;
        item.selected_output = None;
        let rel_path = item.rel_path.clone();
        let next = next_pending(&items, index);
        // The worker locks items while a job runs; release the guard before
        // taking the queue mutex or the two orderings can deadlock
        drop(items);

        self.store.remove_review(&roots.processed, &rel_path)?;

        let accepted = {
            let queue = self.queue.lock().unwrap();
            let queue = queue
                .as_ref()
                .ok_or_else(|| RestyleError::Index("No folder loaded".to_string()))?;
            queue.enqueue(RedoRequest {
                rel_path: rel_path.clone(),
                prompt: prompt.to_string(),
                size_class: self.options.size_class.clone(),
            })
        };
        if !accepted {
            tracing::debug!(item = %rel_path, "redo already queued, not enqueuing again");
        }

        *self.cursor.lock().unwrap() = next;
        Ok(next)
    }
}

impl Drop for ReviewWorkflowEngine {
    fn drop(&mut self) {
        let old_queue = self.queue.lock().unwrap().take();
        if let Some(queue) = old_queue {
            queue.shutdown();
        }
    }
}

/// Next pending item scanning forward from just after `from`, wrapping to
/// the start and excluding `from` itself
fn next_pending(items: &[ReviewItem], from: usize) -> Option<usize> {
    if items.is_empty() {
        return None;
    }
    for offset in 1..=items.len() {
        let idx = (from + offset) % items.len();
        if idx == from {
            continue;
        }
        if !items[idx].reviewed {
            return Some(idx);
        }
    }
    None
}

/// A stored selection is only honored if its index still fits the variation
/// count and the committed output file still exists
fn selection_is_valid(review: &ReviewRecord, variation_count: usize, selection_root: &Path) -> bool {
    review.selected_index >= 1
        && review.selected_index <= variation_count
        && selection_root.join(&review.selected_output).exists()
}

/// Variation files of one set, ordered by numeric suffix then
/// lexicographically
fn list_variations(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort_by_key(|p| {
        let name = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let numeric = p
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(u64::MAX);
        (numeric, name)
    });
    files
}

#[derive(Serialize)]
struct SelectionMeta {
    selected_variation: usize,
    transparent: bool,
    notes: String,
    reviewed_at: i64,
}

#[derive(Serialize)]
struct SelectionMetaFile {
    selection: SelectionMeta,
}

fn write_selection_metadata(dest: &Path, choice: usize, notes: &str, transparent: bool) -> Result<()> {
    let file = SelectionMetaFile {
        selection: SelectionMeta {
            selected_variation: choice,
            transparent,
            notes: notes.to_string(),
            reviewed_at: now_unix(),
        },
    };
    let content = toml::to_string_pretty(&file)?;
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = dest.with_file_name(format!("{}.meta.toml", name));
    std::fs::write(sidecar, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use restyle_gen::{GeneratedImage, GenerationRequest, ImageProvider, MockProvider};
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn wait_idle(engine: &ReviewWorkflowEngine) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !engine.redo_idle() {
            assert!(Instant::now() < deadline, "redo queue never drained");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Mock wrapper that holds each call for a fixed delay
    struct SlowProvider {
        inner: MockProvider,
        delay: Duration,
    }

    impl ImageProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow-mock"
        }
        fn generate(&self, request: &GenerationRequest) -> restyle_core::Result<GeneratedImage> {
            std::thread::sleep(self.delay);
            self.inner.generate(request)
        }
    }

    struct Fixture {
        root: PathBuf,
        source: PathBuf,
        processed: PathBuf,
        selection: PathBuf,
        store: Arc<IndexStore>,
        provider: Arc<MockProvider>,
        engine: ReviewWorkflowEngine,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_provider_delay(None)
        }

        fn slow(delay_ms: u64) -> Self {
            Self::with_provider_delay(Some(delay_ms))
        }

        fn with_provider_delay(delay_ms: Option<u64>) -> Self {
            let root =
                std::env::temp_dir().join(format!("restyle_review_test_{}", uuid::Uuid::new_v4()));
            let source = root.join("photos");
            let processed = root.join("photos_restyled");
            let selection = root.join("photos_selected");
            std::fs::create_dir_all(&source).unwrap();
            std::fs::create_dir_all(&processed).unwrap();
            let store = Arc::new(IndexStore::open(root.join("index.txt")).unwrap());

            let provider = Arc::new(MockProvider::new());
            let boxed: Arc<dyn ImageProvider> = match delay_ms {
                Some(ms) => Arc::new(SlowProvider {
                    inner: MockProvider::new(),
                    delay: Duration::from_millis(ms),
                }),
                None => Arc::clone(&provider) as Arc<dyn ImageProvider>,
            };
            let client = Arc::new(GenerationClient::new(boxed, 1));
            let engine = ReviewWorkflowEngine::new(
                Arc::clone(&store),
                client,
                ReviewOptions {
                    output_suffix: "_restyled".to_string(),
                    selection_suffix: "_selected".to_string(),
                    size_class: "1K".to_string(),
                },
            );
            Self {
                root,
                source,
                processed,
                selection,
                store,
                provider,
                engine,
            }
        }

        /// Source original plus a variation set with `count` junk files
        fn add_item(&self, stem: &str, count: usize) {
            let img = image::RgbaImage::from_pixel(64, 64, image::Rgba([1, 2, 3, 255]));
            let mut buf = Cursor::new(Vec::new());
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut buf, ImageFormat::Png)
                .unwrap();
            std::fs::write(self.source.join(format!("{}.png", stem)), buf.into_inner()).unwrap();

            let dir = self.processed.join(stem);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 1..=count {
                std::fs::write(dir.join(format!("{:03}.png", i)), b"stale variation").unwrap();
            }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.root).ok();
        }
    }

    #[test]
    fn test_load_folder_builds_sorted_pending_items() {
        let fx = Fixture::new();
        fx.add_item("b", 2);
        fx.add_item("a", 3);
        fx.add_item("c", 1);

        let count = fx.engine.load_folder(&fx.processed).unwrap();
        assert_eq!(count, 3);
        let items = fx.engine.items();
        assert_eq!(items[0].rel_path, "a.png");
        assert_eq!(items[0].variations.len(), 3);
        assert!(items.iter().all(|i| !i.reviewed));
        assert_eq!(fx.engine.cursor(), Some(0));
    }

    #[test]
    fn test_variation_ordering_numeric_then_lexicographic() {
        let fx = Fixture::new();
        let dir = fx.processed.join("x");
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["10.png", "2.png", "001.png", "zz.png"] {
            std::fs::write(dir.join(name), b"v").unwrap();
        }
        let ordered: Vec<String> = list_variations(&dir)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(ordered, vec!["001.png", "2.png", "10.png", "zz.png"]);
    }

    #[test]
    fn test_commit_persists_and_advances() {
        let fx = Fixture::new();
        fx.add_item("a", 2);
        fx.add_item("b", 1);
        fx.engine.load_folder(&fx.processed).unwrap();

        let next = fx
            .engine
            .commit_selection(0, 2, "prefer the second", true)
            .unwrap();
        assert_eq!(next, Some(1));
        assert_eq!(fx.engine.cursor(), Some(1));

        let copied = fx.selection.join("a.png");
        assert!(copied.exists());
        assert!(fx.selection.join("a.png.meta.toml").exists());

        let record = fx.store.folder(&fx.processed).unwrap();
        let review = &record.reviews["a.png"];
        assert_eq!(review.selected_index, 2);
        assert_eq!(review.notes, "prefer the second");
        assert!(review.transparent);

        // A reload sees the committed state
        fx.engine.load_folder(&fx.processed).unwrap();
        let items = fx.engine.items();
        assert!(items[0].reviewed);
        assert_eq!(items[0].selected_index, Some(2));
        assert_eq!(fx.engine.cursor(), Some(1));
    }

    #[test]
    fn test_commit_rejects_out_of_range_choice() {
        let fx = Fixture::new();
        fx.add_item("a", 2);
        fx.engine.load_folder(&fx.processed).unwrap();
        assert!(fx.engine.commit_selection(0, 0, "", false).is_err());
        assert!(fx.engine.commit_selection(0, 3, "", false).is_err());
    }

    #[test]
    fn test_cursor_wraps_and_skips_reviewed() {
        let fx = Fixture::new();
        fx.add_item("a", 1);
        fx.add_item("b", 1);
        fx.add_item("c", 1);
        fx.engine.load_folder(&fx.processed).unwrap();

        // Review B, leaving [A:pending, B:reviewed, C:pending]
        fx.engine.commit_selection(1, 1, "", false).unwrap();
        // Advancing from C lands on A, skipping B
        let next = fx.engine.commit_selection(2, 1, "", false).unwrap();
        assert_eq!(next, Some(0));
    }

    #[test]
    fn test_all_reviewed_cursor_is_none() {
        let fx = Fixture::new();
        fx.add_item("a", 1);
        fx.engine.load_folder(&fx.processed).unwrap();
        let next = fx.engine.commit_selection(0, 1, "", false).unwrap();
        assert_eq!(next, None);
        assert_eq!(fx.engine.cursor(), None);
    }

    #[test]
    fn test_invalid_stored_selection_resets_to_pending() {
        let fx = Fixture::new();
        fx.add_item("a", 2);
        fx.engine.load_folder(&fx.processed).unwrap();
        fx.engine.commit_selection(0, 1, "", false).unwrap();

        // Deleting the committed output voids the selection
        std::fs::remove_file(fx.selection.join("a.png")).unwrap();
        fx.engine.load_folder(&fx.processed).unwrap();
        let items = fx.engine.items();
        assert!(!items[0].reviewed);
        let record = fx.store.folder(&fx.processed).unwrap();
        assert!(record.reviews.is_empty());
    }

    #[test]
    fn test_redo_regenerates_in_fifo_order() {
        let fx = Fixture::new();
        fx.add_item("a", 2);
        fx.add_item("b", 2);
        fx.engine.load_folder(&fx.processed).unwrap();

        fx.engine.request_redo(0, "redo A").unwrap();
        fx.engine.request_redo(1, "redo B").unwrap();
        wait_idle(&fx.engine);

        assert_eq!(fx.provider.recorded_prompts(), vec!["redo A", "redo B"]);

        // Client generates 1 variation per item, so the stale second file
        // is gone and the first was rewritten
        let items = fx.engine.items();
        assert_eq!(items[0].variations.len(), 1);
        let content = std::fs::read(&items[0].variations[0]).unwrap();
        assert_ne!(content, b"stale variation");
        assert!(!fx.processed.join("a/002.png").exists());
    }

    #[test]
    fn test_redo_clears_review_state_and_advances() {
        let fx = Fixture::new();
        fx.add_item("a", 1);
        fx.add_item("b", 1);
        fx.engine.load_folder(&fx.processed).unwrap();
        fx.engine.commit_selection(0, 1, "keep", false).unwrap();

        let next = fx.engine.request_redo(0, "again").unwrap();
        assert_eq!(next, Some(1));
        let items = fx.engine.items();
        assert!(!items[0].reviewed);
        assert!(items[0].notes.is_empty());
        wait_idle(&fx.engine);
        let record = fx.store.folder(&fx.processed).unwrap();
        assert!(!record.reviews.contains_key("a.png"));
    }

    #[test]
    fn test_redo_deduplicates_while_in_flight() {
        let fx = Fixture::slow(150);
        fx.add_item("a", 1);
        fx.add_item("b", 1);
        fx.engine.load_folder(&fx.processed).unwrap();

        fx.engine.request_redo(0, "first").unwrap();
        fx.engine.request_redo(0, "duplicate").unwrap();
        assert!(fx.engine.redo_pending() <= 1);
        wait_idle(&fx.engine);
    }

    #[test]
    fn test_concurrent_redo_and_reload_complete() {
        let fx = Fixture::slow(50);
        fx.add_item("a", 1);
        fx.add_item("b", 1);
        fx.add_item("c", 1);
        fx.engine.load_folder(&fx.processed).unwrap();

        // Reloads join the in-flight worker while redos race for the queue;
        // this hangs if any path holds the item list while taking the queue
        let engine = &fx.engine;
        let processed = &fx.processed;
        std::thread::scope(|s| {
            s.spawn(move || {
                for _ in 0..5 {
                    engine.load_folder(processed).unwrap();
                }
            });
            s.spawn(move || {
                for i in 0..15 {
                    engine.request_redo(i % 3, "again").ok();
                    std::thread::sleep(Duration::from_millis(10));
                }
            });
        });
        wait_idle(&fx.engine);
        assert_eq!(fx.engine.items().len(), 3);
    }

    #[test]
    fn test_load_folder_cancels_queued_redo() {
        let fx = Fixture::slow(150);
        fx.add_item("a", 1);
        fx.add_item("b", 1);
        fx.add_item("c", 1);
        fx.engine.load_folder(&fx.processed).unwrap();

        fx.engine.request_redo(0, "a").unwrap();
        fx.engine.request_redo(1, "b").unwrap();
        fx.engine.request_redo(2, "c").unwrap();

        // Switching folders drops queued jobs and waits out the in-flight one
        fx.engine.load_folder(&fx.processed).unwrap();
        assert!(fx.engine.redo_idle());
        assert_eq!(fx.engine.items().len(), 3);
    }

    #[test]
    fn test_vanished_variation_set_drops_item_and_record() {
        let fx = Fixture::new();
        fx.add_item("a", 1);
        fx.add_item("b", 1);
        fx.engine.load_folder(&fx.processed).unwrap();
        fx.engine.commit_selection(1, 1, "", false).unwrap();

        std::fs::remove_dir_all(fx.processed.join("b")).unwrap();
        let count = fx.engine.load_folder(&fx.processed).unwrap();
        assert_eq!(count, 1);
        let record = fx.store.folder(&fx.processed).unwrap();
        assert!(!record.reviews.contains_key("b.png"));
    }
}
