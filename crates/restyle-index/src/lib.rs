//! Restyle Index - durable processing/review state and incremental scanning
//!
//! A flat line-oriented index file records which source files have been
//! generated and which variation sets have been reviewed. The scanner diffs a
//! folder tree against the index so repeated runs only touch new or changed
//! files.

pub mod codec;
pub mod scan;
pub mod store;

pub use scan::{is_supported, scan_folder, ScanItem, ScanReport, SUPPORTED_EXTENSIONS};
pub use store::{FileRecord, FolderRecord, IndexStore, ReviewRecord};
