//! Restyle Core - shared error, configuration and path types
//!
//! Everything else in the workspace builds on the [`RestyleError`] taxonomy
//! and the layered [`RestyleConfig`].

pub mod config;
pub mod error;
pub mod paths;

pub use config::{GenerationConfig, LayoutConfig, RestyleConfig, ServiceConfig};
pub use error::{is_rate_limited, RestyleError, Result};
pub use paths::{
    normalize_folder_key, normalize_rel_key, now_unix, sibling_with_suffix, strip_suffix_sibling,
};
