//! Deterministic, seeded noise.
//!
//! Noise must be reproducible inside a seed epoch (same surface, same content,
//! same config) and differ across sessions. Both properties come from the
//! seed: [`SeedDeriver`] hashes a per-session key together with the surface
//! identity, the config hash and the surface content. Generators built from
//! the same [`NoiseSeed`] produce bit-identical output.
//!
//! - [`CanvasNoise`]: coherent 2-D gradient noise for RGBA pixels, plus
//!   seeded float offsets for text metrics.
//! - [`WebGlNoise`]: a linear congruential stream, one value per buffer byte.
//!
//! Noise levels outside `[0.0, 1.0]` are clamped; NaN counts as zero. A zero
//! level or an empty buffer is a no-op.
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::config::FingerprintConfig;
//! use fingerprint_shield::noise::{CanvasNoise, SeedDeriver};
//!
//! let deriver = SeedDeriver::from_key("session-1");
//! let config = FingerprintConfig::default();
//! let mut pixels = vec![128u8; 4 * 16 * 16];
//!
//! let seed = deriver.derive("canvas-1", &config.hash(), &pixels);
//! CanvasNoise::new(seed).apply_rgba(&mut pixels, 16, 0.5);
//! ```

mod canvas;
mod webgl;

pub use canvas::{CanvasNoise, TextMetrics};
pub use webgl::WebGlNoise;

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::config::ConfigHash;

/// 32-bit seed for one seed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoiseSeed(pub u32);

impl NoiseSeed {
    pub fn value(self) -> u32 {
        self.0
    }
}

/// Shared shape of the pixel and buffer generators.
pub trait NoiseGenerator {
    fn seed(&self) -> NoiseSeed;

    /// Perturb `data` in place. `width` is the row length in pixels for
    /// image data and is ignored for flat buffers.
    fn apply(&mut self, data: &mut [u8], width: u32, level: f64);
}

/// Derives per-epoch seeds from a session key.
#[derive(Clone)]
pub struct SeedDeriver {
    key: [u8; 32],
}

impl fmt::Debug for SeedDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedDeriver").finish_non_exhaustive()
    }
}

impl SeedDeriver {
    /// Stable deriver for a named session. Same key, same seeds, across
    /// process restarts.
    pub fn from_key(key: &str) -> Self {
        let digest = Sha256::new()
            .chain_update(b"fingerprint-shield/session-key\0")
            .chain_update(key.as_bytes())
            .finalize();
        Self { key: digest.into() }
    }

    /// Deriver with a fresh random key.
    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Seed for `surface_id` showing `content` under the config `config`.
    ///
    /// Changes only when the surface content or the config changes.
    pub fn derive(&self, surface_id: &str, config: &ConfigHash, content: &[u8]) -> NoiseSeed {
        let digest = Sha256::new()
            .chain_update(self.key)
            .chain_update((surface_id.len() as u64).to_be_bytes())
            .chain_update(surface_id.as_bytes())
            .chain_update(config.as_bytes())
            .chain_update((content.len() as u64).to_be_bytes())
            .chain_update(content)
            .finalize();
        NoiseSeed(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }
}

/// Linear congruential stream (glibc `rand` constants, 31-bit state).
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    const MASK: u32 = 0x7fff_ffff;

    pub fn new(seed: NoiseSeed) -> Self {
        Self {
            state: seed.0 & Self::MASK,
        }
    }

    pub fn next_u31(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345)
            & Self::MASK;
        self.state
    }

    /// Uniform in `[0.0, 1.0]`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u31()) / f64::from(Self::MASK)
    }

    /// Symmetric offset in `[-level, level]`.
    pub fn next_offset(&mut self, level: f64) -> f64 {
        (self.next_f64() - 0.5) * 2.0 * level
    }
}

/// Murmur-style avalanche of `seed` and `index`.
#[inline]
pub(crate) fn mix(seed: u32, index: u32) -> u32 {
    let mut h = seed ^ index;
    h = (h ^ (h >> 16)).wrapping_mul(0x45d9f3b);
    h = (h ^ (h >> 13)).wrapping_mul(0x45d9f3b);
    h ^ (h >> 16)
}

/// Clamp a caller-supplied level into `[0.0, 1.0]`; NaN becomes 0.
#[inline]
pub(crate) fn sanitize_level(level: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

#[inline]
pub(crate) fn clamp_byte(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
