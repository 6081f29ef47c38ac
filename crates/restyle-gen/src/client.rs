//! Multi-variant generation client
//!
//! Fans out a fixed number of independent requests per source image on
//! scoped threads. The call succeeds if at least one request returns a
//! usable image; otherwise the distinct failure messages collapse into one
//! aggregate error. Variation order is the fan-out index, never arrival
//! order.

use crate::aspect::{aspect_ratio_of, normalize_to_aspect};
use crate::provider::{GeneratedImage, GenerationRequest, ImageProvider};
use restyle_core::{RestyleError, Result};
use std::sync::Arc;

/// Cap on distinct messages carried by an aggregate failure
const MAX_AGGREGATE_ERRORS: usize = 3;

/// Issues concurrent multi-variant generation requests for one source image
pub struct GenerationClient {
    provider: Arc<dyn ImageProvider>,
    variation_count: usize,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn ImageProvider>, variation_count: usize) -> Self {
        Self {
            provider,
            variation_count: variation_count.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn variation_count(&self) -> usize {
        self.variation_count
    }

    /// Generate up to `variation_count` variations of `source`.
    ///
    /// Fails before any network call when the source's reduced aspect ratio
    /// is not supported. Every accepted image is normalized back to the
    /// source's aspect before being returned.
    pub fn generate_variations(
        &self,
        source: &[u8],
        mime: &str,
        prompt: &str,
        size_class: &str,
    ) -> Result<Vec<GeneratedImage>> {
        let decoded = image::load_from_memory(source)
            .map_err(|e| RestyleError::Image(format!("Failed to decode source image: {}", e)))?;
        let (width, height) = (decoded.width(), decoded.height());
        let aspect_ratio = aspect_ratio_of(width, height)?;

        let request = GenerationRequest {
            image: source.to_vec(),
            mime: mime.to_string(),
            prompt: prompt.to_string(),
            size_class: size_class.to_string(),
            aspect_ratio,
        };

        let results: Vec<Result<GeneratedImage>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..self.variation_count)
                .map(|_| s.spawn(|| self.provider.generate(&request)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(RestyleError::Generation(
                            "Generation thread panicked".to_string(),
                        ))
                    })
                })
                .collect()
        });

        let mut images = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        for result in results {
            match result.and_then(|img| normalize_to_aspect(&img, width, height)) {
                Ok(image) => images.push(image),
                Err(e) => {
                    let message = e.to_string();
                    if !errors.contains(&message) {
                        errors.push(message);
                    }
                }
            }
        }

        if images.is_empty() {
            errors.truncate(MAX_AGGREGATE_ERRORS);
            return Err(RestyleError::Generation(errors.join("; ")));
        }
        if !errors.is_empty() {
            tracing::warn!(
                succeeded = images.len(),
                failed = self.variation_count - images.len(),
                "partial fan-out failure"
            );
        }
        Ok(images)
    }
}
