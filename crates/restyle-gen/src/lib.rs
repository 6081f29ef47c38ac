//! Restyle Gen - multi-variant image generation
//!
//! A pluggable provider framework for image-to-image generation with
//! concurrent fan-out, transient-failure retry, payload-schema fallback and
//! aspect normalization of everything a provider returns.

pub mod aspect;
pub mod client;
pub mod provider;
pub mod providers;

pub use aspect::{aspect_ratio_of, normalize_to_aspect, reduced_ratio, SUPPORTED_RATIOS};
pub use client::GenerationClient;
pub use provider::{
    extension_for_mime, mime_for_path, GeneratedImage, GenerationRequest, ImageProvider,
};
pub use providers::{create_provider, GeminiProvider, MockProvider, ScriptStep};
