//! Mock provider for testing
//!
//! Generates solid-color PNGs locally without any network calls. A scripted
//! mode hands out a fixed sequence of successes and failures so fan-out and
//! queue behavior can be exercised deterministically.

use crate::provider::{GeneratedImage, GenerationRequest, ImageProvider};
use image::ImageFormat;
use restyle_core::{RestyleError, Result};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

/// One scripted outcome for a mock generation call
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return a solid PNG matching the requested aspect ratio
    Succeed,
    /// Fail with a service error carrying this message
    Fail(String),
}

/// A mock provider that generates placeholder images locally
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<ScriptStep>>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Always succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow `steps` in order; once exhausted, succeed
    pub fn with_script(steps: Vec<ScriptStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far, in call order
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ImageProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptStep::Succeed);
        match step {
            ScriptStep::Succeed => solid_png(&request.aspect_ratio),
            ScriptStep::Fail(message) => Err(RestyleError::Service(message)),
        }
    }
}

/// A solid PNG whose dimensions honor the requested aspect-ratio string
fn solid_png(aspect_ratio: &str) -> Result<GeneratedImage> {
    let (w, h) = aspect_ratio
        .split_once(':')
        .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
        .unwrap_or((1, 1));
    let img = image::RgbaImage::from_pixel(w * 64, h * 64, image::Rgba([90, 120, 180, 255]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| RestyleError::Image(format!("Failed to encode mock PNG: {}", e)))?;
    Ok(GeneratedImage {
        bytes: buf.into_inner(),
        mime: "image/png".to_string(),
    })
}
