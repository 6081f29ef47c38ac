//! Incremental folder scanning
//!
//! Walks a source tree, diffs each supported file against the index and
//! classifies it as pending or already done. Scanning is idempotent: an
//! unchanged folder produces the same report and leaves the index untouched.

use crate::store::{FolderRecord, IndexStore};
use restyle_core::{normalize_rel_key, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions the pipeline will pick up, lowercase
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// One discovered source file and its classification
#[derive(Debug, Clone)]
pub struct ScanItem {
    /// Relative path as discovered, `/`-separated, original case
    pub rel_path: String,
    /// Normalized index key for this item
    pub key: String,
    pub abs_path: PathBuf,
    pub size: u64,
    pub modified_unix: i64,
    /// True if the file still needs generation
    pub pending: bool,
}

/// Result of scanning one source folder
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Items in sorted key order
    pub items: Vec<ScanItem>,
    pub total: usize,
    pub pending: usize,
    pub done: usize,
}

/// Whether a path has a supported image extension
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scan `source`, classifying files against the folder record keyed by
/// `processed` (the sibling output folder). Records for files no longer
/// present are pruned as a side effect.
pub fn scan_folder(
    store: &IndexStore,
    source: &Path,
    processed: &Path,
    selection: &Path,
) -> Result<ScanReport> {
    let folder = store.get_or_create_folder(processed, source, selection)?;

    let mut items = Vec::new();
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during scan");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        if rel.is_empty() {
            continue;
        }
        let meta = entry.metadata().map_err(|e| {
            std::io::Error::other(format!("metadata for {}: {}", entry.path().display(), e))
        })?;
        let modified_unix = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let key = normalize_rel_key(&rel);
        let pending = !is_done(&folder, &key, meta.len(), modified_unix, processed);
        items.push(ScanItem {
            rel_path: rel,
            key,
            abs_path: entry.path().to_path_buf(),
            size: meta.len(),
            modified_unix,
            pending,
        });
    }

    items.sort_by(|a, b| a.key.cmp(&b.key));

    let keep: HashSet<String> = items.iter().map(|i| i.key.clone()).collect();
    store.prune(processed, &keep)?;

    let total = items.len();
    let pending = items.iter().filter(|i| i.pending).count();
    Ok(ScanReport {
        items,
        total,
        pending,
        done: total - pending,
    })
}

/// Done iff the stored identity tuple matches and every declared output still
/// exists under the processed folder.
fn is_done(folder: &FolderRecord, key: &str, size: u64, modified_unix: i64, processed: &Path) -> bool {
    let Some(record) = folder.files.get(key) else {
        return false;
    };
    if record.size != size || record.modified_unix != modified_unix {
        return false;
    }
    if record.outputs.is_empty() {
        return false;
    }
    record.outputs.iter().all(|out| processed.join(out).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileRecord;
    use std::fs;

    struct Fixture {
        root: PathBuf,
        source: PathBuf,
        processed: PathBuf,
        selection: PathBuf,
        store: IndexStore,
    }

    impl Fixture {
        fn new() -> Self {
            let root =
                std::env::temp_dir().join(format!("restyle_scan_test_{}", uuid::Uuid::new_v4()));
            let source = root.join("photos");
            fs::create_dir_all(&source).unwrap();
            let processed = root.join("photos_restyled");
            let selection = root.join("photos_selected");
            let store = IndexStore::open(root.join("index.txt")).unwrap();
            Self {
                root,
                source,
                processed,
                selection,
                store,
            }
        }

        fn write_source(&self, rel: &str) {
            let path = self.source.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"not really an image").unwrap();
        }

        fn scan(&self) -> ScanReport {
            scan_folder(&self.store, &self.source, &self.processed, &self.selection).unwrap()
        }

        fn mark_done(&self, item: &ScanItem) {
            let out_rel = format!("{}/001.png", item.rel_path);
            let out_abs = self.processed.join(&out_rel);
            fs::create_dir_all(out_abs.parent().unwrap()).unwrap();
            fs::write(&out_abs, b"output").unwrap();
            self.store
                .upsert_file(
                    &self.processed,
                    FileRecord {
                        rel_path: item.rel_path.clone(),
                        size: item.size,
                        modified_unix: item.modified_unix,
                        outputs: vec![out_rel],
                        processed_unix: 1,
                    },
                )
                .unwrap();
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            fs::remove_dir_all(&self.root).ok();
        }
    }

    #[test]
    fn test_fresh_folder_is_all_pending() {
        let fx = Fixture::new();
        fx.write_source("a.jpg");
        fx.write_source("sub/b.png");
        fx.write_source("notes.txt"); // unsupported, ignored

        let report = fx.scan();
        assert_eq!(report.total, 2);
        assert_eq!(report.pending, 2);
        assert_eq!(report.done, 0);
        assert_eq!(report.items[0].rel_path, "a.jpg");
        assert_eq!(report.items[1].rel_path, "sub/b.png");
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let fx = Fixture::new();
        fx.write_source("a.jpg");
        let first = fx.scan();
        let index_after_first = fs::read_to_string(fx.store.path()).unwrap();
        let second = fx.scan();
        let index_after_second = fs::read_to_string(fx.store.path()).unwrap();

        assert_eq!(first.pending, second.pending);
        assert_eq!(first.done, second.done);
        assert_eq!(index_after_first, index_after_second);
    }

    #[test]
    fn test_done_requires_matching_tuple_and_outputs() {
        let fx = Fixture::new();
        fx.write_source("a.jpg");
        let report = fx.scan();
        fx.mark_done(&report.items[0]);

        let report = fx.scan();
        assert_eq!(report.done, 1);
        assert_eq!(report.pending, 0);

        // Growing the file flips it back to pending
        fs::write(fx.source.join("a.jpg"), b"different, longer content!").unwrap();
        let report = fx.scan();
        assert_eq!(report.pending, 1);
    }

    #[test]
    fn test_deleted_output_flips_back_to_pending() {
        let fx = Fixture::new();
        fx.write_source("a.jpg");
        let report = fx.scan();
        fx.mark_done(&report.items[0]);
        assert_eq!(fx.scan().done, 1);

        fs::remove_file(fx.processed.join("a.jpg/001.png")).unwrap();
        let report = fx.scan();
        assert_eq!(report.done, 0);
        assert_eq!(report.pending, 1);
    }

    #[test]
    fn test_vanished_source_is_pruned() {
        let fx = Fixture::new();
        fx.write_source("a.jpg");
        fx.write_source("b.jpg");
        let report = fx.scan();
        fx.mark_done(&report.items[0]);
        fx.mark_done(&report.items[1]);

        fs::remove_file(fx.source.join("b.jpg")).unwrap();
        let report = fx.scan();
        assert_eq!(report.total, 1);

        let record = fx.store.folder(&fx.processed).unwrap();
        assert!(record.files.contains_key("a.jpg"));
        assert!(!record.files.contains_key("b.jpg"));
    }
}
