//! Raster asset utilities
//!
//! Data-URL decoding for persisted templates, PNG data-URL encoding for
//! generated output, upload downscaling, and the transparency scans the
//! editor uses to seed frame placement.

use base64::Engine;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;
use tracing::debug;

use crate::domain::Rect;

/// Alpha below which a pixel counts as part of a transparent window
const TRANSPARENT_ALPHA_THRESHOLD: u8 = 128;

/// Grid resolution for the sampled transparency check
const TRANSPARENCY_SAMPLE_GRID: u32 = 10;

/// Asset decoding errors
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("not a base64 data URL")]
    InvalidDataUrl,
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode a `data:<mime>;base64,<payload>` URL into a raster.
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage, AssetError> {
    let payload = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or(AssetError::InvalidDataUrl)?;

    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Wrap PNG bytes as a base64 data URL.
pub fn to_png_data_url(png_bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes)
    )
}

/// Downscale an image to fit within `max_width` x `max_height`, preserving
/// aspect ratio. Images already within bounds are returned untouched.
pub fn downscale_within(image: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w <= max_width && h <= max_height {
        return image.clone();
    }

    let ratio = (max_width as f64 / w as f64).min(max_height as f64 / h as f64);
    let new_w = ((w as f64 * ratio).round() as u32).max(1);
    let new_h = ((h as f64 * ratio).round() as u32).max(1);

    debug!(from_w = w, from_h = h, to_w = new_w, to_h = new_h, "Downscaling asset");

    image.resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3)
}

/// Sampled check for any transparency; upload flows use it to decide
/// between PNG and a lossy re-encode.
pub fn has_transparency(image: &DynamicImage) -> bool {
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return false;
    }

    let step_x = (w / TRANSPARENCY_SAMPLE_GRID).max(1);
    let step_y = (h / TRANSPARENCY_SAMPLE_GRID).max(1);

    let mut y = 0;
    while y < h {
        let mut x = 0;
        while x < w {
            if rgba.get_pixel(x, y).0[3] < 255 {
                return true;
            }
            x += step_x;
        }
        y += step_y;
    }
    false
}

/// Bounding box of the transparent window in a baseplate, if any.
///
/// The editor seeds the event-image frame from this region when a plate
/// with a punched-out window is uploaded.
pub fn detect_transparent_region(image: &DynamicImage) -> Option<Rect> {
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();

    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for y in 0..h {
        for x in 0..w {
            if rgba.get_pixel(x, y).0[3] < TRANSPARENT_ALPHA_THRESHOLD {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    if !found {
        return None;
    }

    Some(Rect::new(
        min_x as f32,
        min_y as f32,
        (max_x - min_x + 1) as f32,
        (max_y - min_y + 1) as f32,
    ))
}
