//! Canvas 2-D spoofing surface.
//!
//! [`CanvasShield`] perturbs what a page reads back from a canvas:
//! `getImageData` pixels, `toDataURL` exports and `measureText` results.
//! Every entry point is total. Anything it cannot handle (a non-PNG data URL,
//! a corrupt payload) comes back unchanged.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::config::CanvasConfig;
use crate::noise::{CanvasNoise, NoiseSeed, TextMetrics};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
enum DataUrlError {
    #[error("not a base64 PNG data URL")]
    NotPng,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}

/// Canvas spoofing for one config.
#[derive(Debug, Clone, Copy)]
pub struct CanvasShield<'a> {
    config: &'a CanvasConfig,
}

impl<'a> CanvasShield<'a> {
    pub fn new(config: &'a CanvasConfig) -> Self {
        Self { config }
    }

    /// Perturb RGBA pixels returned by `getImageData`. Returns whether noise
    /// was applied.
    pub fn protect_image_data(&self, seed: NoiseSeed, pixels: &mut [u8], width: u32) -> bool {
        if !self.config.noise_active() || !self.config.protect_image_data {
            return false;
        }
        if width == 0 || pixels.len() < 4 {
            return false;
        }
        CanvasNoise::new(seed).apply_rgba(pixels, width, self.config.noise_level);
        true
    }

    /// Perturb a `toDataURL` export.
    ///
    /// Only PNG data URLs are rewritten; the image is decoded, noised like
    /// image data and re-encoded. `seed_for` receives the decoded RGBA pixels,
    /// so an export gets the same noise field as `getImageData` on the same
    /// canvas. `None` means the export goes out as is.
    pub fn protect_data_url<F>(&self, data_url: &str, seed_for: F) -> Option<String>
    where
        F: FnOnce(&[u8]) -> NoiseSeed,
    {
        if !self.config.noise_active() || !self.config.protect_data_url {
            return None;
        }
        match perturb_png_data_url(data_url, self.config.noise_level, seed_for) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Leaving canvas export unmodified: {}", e);
                None
            }
        }
    }

    /// Jitter `measureText` output, or pass it through when text metric
    /// spoofing is off.
    pub fn text_metrics(&self, seed: NoiseSeed, metrics: TextMetrics) -> TextMetrics {
        if !self.config.enabled || !self.config.spoof_text_metrics {
            return metrics;
        }
        CanvasNoise::new(seed).perturb_text_metrics(metrics)
    }
}

fn perturb_png_data_url<F>(data_url: &str, level: f64, seed_for: F) -> Result<String, DataUrlError>
where
    F: FnOnce(&[u8]) -> NoiseSeed,
{
    let payload = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or(DataUrlError::NotPng)?;
    let bytes = BASE64.decode(payload.trim())?;

    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8();
    let (width, height) = image.dimensions();
    let mut pixels = image.into_raw();
    let seed = seed_for(&pixels);
    CanvasNoise::new(seed).apply_rgba(&mut pixels, width, level);

    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded).write_image(&pixels, width, height, ColorType::Rgba8)?;

    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, BASE64.encode(encoded)))
}
