//! Image provider trait and request/result types

use restyle_core::Result;
use std::path::Path;

/// A request to generate one image variation from a source image
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Source image bytes
    pub image: Vec<u8>,
    /// Declared mime type of the source image
    pub mime: String,
    /// Free-text instruction for the transformation
    pub prompt: String,
    /// Target size class (e.g. "1K", "2K")
    pub size_class: String,
    /// Reduced aspect-ratio string (e.g. "4:3"), already validated
    pub aspect_ratio: String,
}

/// One generated image as returned by a provider
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Trait implemented by each generation backend (Gemini, Mock)
pub trait ImageProvider: Send + Sync {
    /// Provider name (e.g. "gemini", "mock")
    fn name(&self) -> &str;

    /// Issue one generation request, blocking until an image or error
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;
}

/// Mime type for a source file, by extension
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// File extension for a generated image's mime type
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        _ => "png",
    }
}
