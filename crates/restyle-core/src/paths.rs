//! Path helpers shared by the scan, batch and review layers

use std::path::{Path, PathBuf};

/// Sibling directory named by appending `suffix` to `folder`'s name.
///
/// `/photos/trip` + `_restyled` -> `/photos/trip_restyled`
pub fn sibling_with_suffix(folder: &Path, suffix: &str) -> PathBuf {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    folder.with_file_name(format!("{}{}", name, suffix))
}

/// Inverse of [`sibling_with_suffix`]: the source folder a processed folder
/// was derived from, if its name carries the suffix.
pub fn strip_suffix_sibling(folder: &Path, suffix: &str) -> Option<PathBuf> {
    let name = folder.file_name()?.to_string_lossy().into_owned();
    let base = name.strip_suffix(suffix)?;
    if base.is_empty() {
        return None;
    }
    Some(folder.with_file_name(base))
}

/// Canonical form of a relative path used as an item key.
///
/// Keys are compared case-insensitively and always use `/` separators so the
/// index round-trips between platforms.
pub fn normalize_rel_key(rel: &str) -> String {
    rel.replace('\\', "/").to_lowercase()
}

/// Canonical form of an absolute folder path used as a folder key.
pub fn normalize_folder_key(path: &Path) -> String {
    normalize_rel_key(&path.to_string_lossy()).trim_end_matches('/').to_string()
}

/// Seconds since the Unix epoch
pub fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
