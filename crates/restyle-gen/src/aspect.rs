//! Aspect-ratio reduction and output normalization
//!
//! The generation service only accepts a fixed set of aspect-ratio strings,
//! and what it returns does not always match the requested ratio exactly.
//! [`aspect_ratio_of`] validates a source before any network call is paid
//! for; [`normalize_to_aspect`] center-crops a generated image so its aspect
//! matches the source.

use crate::provider::GeneratedImage;
use image::ImageFormat;
use restyle_core::{RestyleError, Result};
use std::io::Cursor;

/// Aspect-ratio strings the generation service accepts
pub const SUPPORTED_RATIOS: &[&str] = &[
    "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
];

/// Ratio mismatch below this fraction is passed through unchanged
const RATIO_TOLERANCE: f64 = 0.01;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Reduce `width:height` by their greatest common divisor
pub fn reduced_ratio(width: u32, height: u32) -> (u32, u32) {
    let d = gcd(width, height).max(1);
    (width / d, height / d)
}

/// The service aspect-ratio string for a source image, or an
/// unsupported-input error raised before any network call.
///
/// The source ratio is reduced via gcd and matched against the reduced form
/// of each supported entry, so a 2520x1080 source (7:3 reduced) maps to the
/// service's canonical "21:9".
pub fn aspect_ratio_of(width: u32, height: u32) -> Result<String> {
    if width == 0 || height == 0 {
        return Err(RestyleError::UnsupportedAspect { width, height });
    }
    let (rw, rh) = reduced_ratio(width, height);
    for supported in SUPPORTED_RATIOS {
        let Some((sw, sh)) = supported.split_once(':') else {
            continue;
        };
        let (Ok(sw), Ok(sh)) = (sw.parse::<u32>(), sh.parse::<u32>()) else {
            continue;
        };
        if reduced_ratio(sw, sh) == (rw, rh) {
            return Ok(supported.to_string());
        }
    }
    Err(RestyleError::UnsupportedAspect {
        width: rw,
        height: rh,
    })
}

/// Center-crop `image` so its aspect matches `target_w:target_h`.
///
/// Invalid targets and images already within tolerance are returned
/// unchanged. The crop keeps the centered region of the longer axis and
/// re-encodes in a format compatible with the input (JPEG stays JPEG,
/// everything else becomes PNG). Applying this twice with the same target
/// yields the same bytes as applying it once.
pub fn normalize_to_aspect(
    image: &GeneratedImage,
    target_w: u32,
    target_h: u32,
) -> Result<GeneratedImage> {
    if target_w == 0 || target_h == 0 {
        return Ok(image.clone());
    }
    let decoded = image::load_from_memory(&image.bytes)
        .map_err(|e| RestyleError::Image(format!("Failed to decode generated image: {}", e)))?;
    let (w, h) = (decoded.width(), decoded.height());
    if w == 0 || h == 0 {
        return Ok(image.clone());
    }

    let current = w as f64 / h as f64;
    let target = target_w as f64 / target_h as f64;
    if (current / target - 1.0).abs() <= RATIO_TOLERANCE {
        return Ok(image.clone());
    }

    let (crop_w, crop_h, x, y) = if current > target {
        // Too wide: crop width, centered
        let cw = ((h as f64 * target).round() as u32).clamp(1, w);
        (cw, h, (w - cw) / 2, 0)
    } else {
        // Too tall: crop height, centered
        let ch = ((w as f64 / target).round() as u32).clamp(1, h);
        (w, ch, 0, (h - ch) / 2)
    };
    let cropped = decoded.crop_imm(x, y, crop_w, crop_h);

    let source_format = image::guess_format(&image.bytes).unwrap_or(ImageFormat::Png);
    let mut buf = Cursor::new(Vec::new());
    let mime = if source_format == ImageFormat::Jpeg {
        // JPEG has no alpha channel
        cropped
            .to_rgb8()
            .write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(|e| RestyleError::Image(format!("Failed to encode JPEG: {}", e)))?;
        "image/jpeg"
    } else {
        cropped
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| RestyleError::Image(format!("Failed to encode PNG: {}", e)))?;
        "image/png"
    };

    Ok(GeneratedImage {
        bytes: buf.into_inner(),
        mime: mime.to_string(),
    })
}
