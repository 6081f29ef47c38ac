//! Error types for the restyle pipeline

use thiserror::Error;

/// The main error type for restyle operations
#[derive(Debug, Error)]
pub enum RestyleError {
    /// Missing or invalid credentials/configuration. Fatal to the call,
    /// never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient connectivity failure after the retry budget was exhausted.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the generation service. Not retried.
    #[error("Service error: {0}")]
    Service(String),

    /// The source image's reduced aspect ratio is not accepted by the
    /// generation service. Raised before any network call.
    #[error("Unsupported aspect ratio {width}:{height}")]
    UnsupportedAspect { width: u32, height: u32 },

    /// The service answered success but no image payload could be located.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// All fan-out requests for one source image failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Index file could not be read or written.
    #[error("Index error: {0}")]
    Index(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),
}

/// Result type alias for restyle operations
pub type Result<T> = std::result::Result<T, RestyleError>;

impl From<toml::de::Error> for RestyleError {
    fn from(err: toml::de::Error) -> Self {
        RestyleError::TomlParse(err.to_string())
    }
}

impl From<toml::ser::Error> for RestyleError {
    fn from(err: toml::ser::Error) -> Self {
        RestyleError::TomlSer(err.to_string())
    }
}

/// Whether a failure message looks like a rate-limit / quota rejection.
///
/// The batch driver uses this to decide between the normal inter-item delay
/// and the longer cooldown.
pub fn is_rate_limited(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("429")
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
}
