//! Flat-file index of processed folders, batch outputs and review state
//!
//! One record per line, tab-separated, tagged by the first field:
//! - `F` folder record: processed folder, source folder, selection folder
//! - `R` file record: identity tuple + output list for a batch-processed file
//! - `V` review record: committed selection for a variation set
//!
//! The whole store fits in memory; every mutation happens under one lock and
//! is followed by a full rewrite of the backing file.

use crate::codec::{decode_field, decode_list, encode_field, encode_list};
use restyle_core::{normalize_folder_key, normalize_rel_key, RestyleError, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Identity and outputs of one batch-processed source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative path as discovered, `/`-separated
    pub rel_path: String,
    pub size: u64,
    pub modified_unix: i64,
    /// Output paths relative to the processed folder, in variation order
    pub outputs: Vec<String>,
    pub processed_unix: i64,
}

/// A committed review selection for one variation set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub rel_path: String,
    /// 1-based index into the ordered variation list
    pub selected_index: usize,
    pub notes: String,
    pub transparent: bool,
    /// Selected output path relative to the selection folder
    pub selected_output: String,
    pub reviewed_unix: i64,
}

/// Per-folder state: identity of the folder triple plus its item records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderRecord {
    /// Processed folder (the variation sets), absolute, as first observed
    pub folder: String,
    /// Source folder the originals live in
    pub source_folder: String,
    /// Selection folder review commits copy into
    pub selection_folder: String,
    /// Batch records keyed by normalized relative path
    pub files: BTreeMap<String, FileRecord>,
    /// Review records keyed by normalized relative path
    pub reviews: BTreeMap<String, ReviewRecord>,
}

/// The persistent index. All reads and mutations are serialized by one lock;
/// every mutating operation rewrites the whole file before returning.
pub struct IndexStore {
    path: PathBuf,
    inner: Mutex<BTreeMap<String, FolderRecord>>,
}

impl IndexStore {
    /// Open the index at `path`, loading existing records. A missing file is
    /// an empty store; malformed lines are skipped, not fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let folders = match std::fs::read_to_string(&path) {
            Ok(content) => parse_index(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: Mutex::new(folders),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of one folder's record
    pub fn folder(&self, folder: &Path) -> Option<FolderRecord> {
        let map = self.inner.lock().unwrap();
        map.get(&normalize_folder_key(folder)).cloned()
    }

    /// Number of known folders (for tests and diagnostics)
    pub fn folder_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Fetch or create the record for a processed folder. Folder records are
    /// created on first scan and never deleted.
    pub fn get_or_create_folder(
        &self,
        folder: &Path,
        source: &Path,
        selection: &Path,
    ) -> Result<FolderRecord> {
        let key = normalize_folder_key(folder);
        let mut map = self.inner.lock().unwrap();
        if let Some(existing) = map.get(&key) {
            return Ok(existing.clone());
        }
        let record = FolderRecord {
            folder: folder.to_string_lossy().into_owned(),
            source_folder: source.to_string_lossy().into_owned(),
            selection_folder: selection.to_string_lossy().into_owned(),
            files: BTreeMap::new(),
            reviews: BTreeMap::new(),
        };
        map.insert(key, record.clone());
        self.save_locked(&map)?;
        Ok(record)
    }

    /// Insert or replace the batch record for one file
    pub fn upsert_file(&self, folder: &Path, record: FileRecord) -> Result<()> {
        let mut map = self.inner.lock().unwrap();
        let entry = Self::folder_mut(&mut map, folder)?;
        entry
            .files
            .insert(normalize_rel_key(&record.rel_path), record);
        self.save_locked(&map)
    }

    /// Insert or replace the review record for one variation set
    pub fn upsert_review(&self, folder: &Path, record: ReviewRecord) -> Result<()> {
        let mut map = self.inner.lock().unwrap();
        let entry = Self::folder_mut(&mut map, folder)?;
        entry
            .reviews
            .insert(normalize_rel_key(&record.rel_path), record);
        self.save_locked(&map)
    }

    /// Remove a review record, e.g. when its item is sent back for redo.
    /// Returns whether a record existed.
    pub fn remove_review(&self, folder: &Path, rel_path: &str) -> Result<bool> {
        let mut map = self.inner.lock().unwrap();
        let entry = Self::folder_mut(&mut map, folder)?;
        let removed = entry.reviews.remove(&normalize_rel_key(rel_path)).is_some();
        if removed {
            self.save_locked(&map)?;
        }
        Ok(removed)
    }

    /// Drop item records whose key is absent from `keep`. Called after every
    /// scan so the store never points at files that no longer exist.
    /// Returns the number of records removed.
    pub fn prune(&self, folder: &Path, keep: &HashSet<String>) -> Result<usize> {
        let mut map = self.inner.lock().unwrap();
        let entry = Self::folder_mut(&mut map, folder)?;
        let before = entry.files.len() + entry.reviews.len();
        entry.files.retain(|key, _| keep.contains(key));
        entry.reviews.retain(|key, _| keep.contains(key));
        let removed = before - entry.files.len() - entry.reviews.len();
        if removed > 0 {
            self.save_locked(&map)?;
        }
        Ok(removed)
    }

    fn folder_mut<'a>(
        map: &'a mut BTreeMap<String, FolderRecord>,
        folder: &Path,
    ) -> Result<&'a mut FolderRecord> {
        map.get_mut(&normalize_folder_key(folder)).ok_or_else(|| {
            RestyleError::Index(format!("Unknown folder: {}", folder.display()))
        })
    }

    /// Full rewrite in deterministic sorted order, via temp file then rename.
    fn save_locked(&self, map: &BTreeMap<String, FolderRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        for record in map.values() {
            out.push_str(&format_folder_line(record));
            for file in record.files.values() {
                out.push_str(&format_file_line(record, file));
            }
            for review in record.reviews.values() {
                out.push_str(&format_review_line(record, review));
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, out)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn format_folder_line(record: &FolderRecord) -> String {
    format!(
        "F\t{}\t{}\t{}\n",
        encode_field(&record.folder),
        encode_field(&record.source_folder),
        encode_field(&record.selection_folder),
    )
}

fn format_file_line(folder: &FolderRecord, file: &FileRecord) -> String {
    format!(
        "R\t{}\t{}\t{}\t{}\t{}\t{}\n",
        encode_field(&folder.folder),
        encode_field(&file.rel_path),
        file.size,
        file.modified_unix,
        encode_list(&file.outputs),
        file.processed_unix,
    )
}

fn format_review_line(folder: &FolderRecord, review: &ReviewRecord) -> String {
    format!(
        "V\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        encode_field(&folder.folder),
        encode_field(&review.rel_path),
        review.selected_index,
        if review.transparent { 1 } else { 0 },
        encode_field(&review.notes),
        encode_field(&review.selected_output),
        review.reviewed_unix,
    )
}

fn parse_index(content: &str) -> BTreeMap<String, FolderRecord> {
    let mut folders: BTreeMap<String, FolderRecord> = BTreeMap::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        if !parse_line(line, &mut folders) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "skipped malformed index lines");
    }
    folders
}

/// Parse one line into `folders`. Returns false if the line is malformed.
fn parse_line(line: &str, folders: &mut BTreeMap<String, FolderRecord>) -> bool {
    let fields: Vec<&str> = line.split('\t').collect();
    match fields.first().copied() {
        Some("F") if fields.len() == 4 => {
            let folder = decode_field(fields[1]);
            let key = normalize_folder_key(Path::new(&folder));
            folders.entry(key).or_insert_with(|| FolderRecord {
                folder,
                source_folder: decode_field(fields[2]),
                selection_folder: decode_field(fields[3]),
                ..Default::default()
            });
            true
        }
        Some("R") if fields.len() == 7 => {
            let folder = decode_field(fields[1]);
            let rel_path = decode_field(fields[2]);
            let (size, modified, processed) = match (
                fields[3].parse::<u64>(),
                fields[4].parse::<i64>(),
                fields[6].parse::<i64>(),
            ) {
                (Ok(s), Ok(m), Ok(p)) => (s, m, p),
                _ => return false,
            };
            let Some(entry) = folders.get_mut(&normalize_folder_key(Path::new(&folder))) else {
                return false;
            };
            entry.files.insert(
                normalize_rel_key(&rel_path),
                FileRecord {
                    rel_path,
                    size,
                    modified_unix: modified,
                    outputs: decode_list(fields[5]),
                    processed_unix: processed,
                },
            );
            true
        }
        Some("V") if fields.len() == 8 => {
            let folder = decode_field(fields[1]);
            let rel_path = decode_field(fields[2]);
            let (selected, reviewed) =
                match (fields[3].parse::<usize>(), fields[7].parse::<i64>()) {
                    (Ok(s), Ok(r)) => (s, r),
                    _ => return false,
                };
            let transparent = match fields[4] {
                "1" => true,
                "0" => false,
                _ => return false,
            };
            let Some(entry) = folders.get_mut(&normalize_folder_key(Path::new(&folder))) else {
                return false;
            };
            entry.reviews.insert(
                normalize_rel_key(&rel_path),
                ReviewRecord {
                    rel_path,
                    selected_index: selected,
                    notes: decode_field(fields[5]),
                    transparent,
                    selected_output: decode_field(fields[6]),
                    reviewed_unix: reviewed,
                },
            );
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_index() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("restyle_index_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("index.txt")
    }

    fn sample_file(rel: &str) -> FileRecord {
        FileRecord {
            rel_path: rel.to_string(),
            size: 1234,
            modified_unix: 1_700_000_000,
            outputs: vec![
                format!("{}/001.png", rel),
                format!("{}/002.png", rel),
            ],
            processed_unix: 1_700_000_100,
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let store = IndexStore::open(temp_index()).unwrap();
        assert_eq!(store.folder_count(), 0);
    }

    #[test]
    fn test_save_load_roundtrip_with_special_characters() {
        let path = temp_index();
        let folder = Path::new("/photos/Ünïcode trip_restyled");
        {
            let store = IndexStore::open(&path).unwrap();
            store
                .get_or_create_folder(
                    folder,
                    Path::new("/photos/Ünïcode trip"),
                    Path::new("/photos/Ünïcode trip_selected"),
                )
                .unwrap();
            store
                .upsert_file(folder, sample_file("sub dir/im age.jpg"))
                .unwrap();
            store
                .upsert_review(
                    folder,
                    ReviewRecord {
                        rel_path: "sub dir/im age.jpg".to_string(),
                        selected_index: 2,
                        notes: "tab\there, newline\nthere, 100% | done".to_string(),
                        transparent: true,
                        selected_output: "sub dir/im age.png".to_string(),
                        reviewed_unix: 1_700_000_200,
                    },
                )
                .unwrap();
        }

        let reloaded = IndexStore::open(&path).unwrap();
        let record = reloaded.folder(folder).expect("folder survives reload");
        assert_eq!(record.source_folder, "/photos/Ünïcode trip");
        assert_eq!(record.files.len(), 1);
        let file = &record.files["sub dir/im age.jpg"];
        assert_eq!(file.size, 1234);
        assert_eq!(file.outputs.len(), 2);
        let review = &record.reviews["sub dir/im age.jpg"];
        assert_eq!(review.selected_index, 2);
        assert_eq!(review.notes, "tab\there, newline\nthere, 100% | done");
        assert!(review.transparent);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let path = temp_index();
        let folder_line = "F\t/p_restyled\t/p\t/p_selected\n";
        let garbage = "not a record\nR\t/p_restyled\ttoo\tfew\nX\twhat\n";
        let good_item = "R\t/p_restyled\ta.jpg\t10\t20\ta.jpg/001.png\t30\n";
        std::fs::write(&path, format!("{}{}{}", folder_line, garbage, good_item)).unwrap();

        let store = IndexStore::open(&path).unwrap();
        let record = store.folder(Path::new("/p_restyled")).unwrap();
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.files["a.jpg"].size, 10);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_prune_removes_vanished_keys() {
        let path = temp_index();
        let folder = Path::new("/p_restyled");
        let store = IndexStore::open(&path).unwrap();
        store
            .get_or_create_folder(folder, Path::new("/p"), Path::new("/p_selected"))
            .unwrap();
        store.upsert_file(folder, sample_file("keep.jpg")).unwrap();
        store.upsert_file(folder, sample_file("gone.jpg")).unwrap();

        let keep: HashSet<String> = ["keep.jpg".to_string()].into_iter().collect();
        let removed = store.prune(folder, &keep).unwrap();
        assert_eq!(removed, 1);
        let record = store.folder(folder).unwrap();
        assert!(record.files.contains_key("keep.jpg"));
        assert!(!record.files.contains_key("gone.jpg"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_case_insensitive_keys() {
        let path = temp_index();
        let folder = Path::new("/p_restyled");
        let store = IndexStore::open(&path).unwrap();
        store
            .get_or_create_folder(folder, Path::new("/p"), Path::new("/p_selected"))
            .unwrap();
        store.upsert_file(folder, sample_file("Sub/IMG.JPG")).unwrap();
        store.upsert_file(folder, sample_file("sub/img.jpg")).unwrap();

        // Same key after normalization: the second upsert replaces the first
        let record = store.folder(folder).unwrap();
        assert_eq!(record.files.len(), 1);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let path = temp_index();
        let folder = Path::new("/p_restyled");
        let store = IndexStore::open(&path).unwrap();
        store
            .get_or_create_folder(folder, Path::new("/p"), Path::new("/p_selected"))
            .unwrap();
        store.upsert_file(folder, sample_file("b.jpg")).unwrap();
        store.upsert_file(folder, sample_file("a.jpg")).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        // Re-upserting in a different order produces byte-identical output
        store.upsert_file(folder, sample_file("a.jpg")).unwrap();
        store.upsert_file(folder, sample_file("b.jpg")).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
