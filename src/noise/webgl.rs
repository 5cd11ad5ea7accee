//! WebGL buffer and parameter noise.
//!
//! One LCG stream per seed epoch; every byte consumes exactly one value, so
//! the same buffer under the same seed always comes out the same.

use super::{clamp_byte, sanitize_level, Lcg, NoiseGenerator, NoiseSeed};

/// Integer parameters move by at most `level * INT_SCALE`.
const INT_SCALE: f64 = 100.0;

/// Seeded WebGL noise generator.
#[derive(Debug, Clone)]
pub struct WebGlNoise {
    seed: NoiseSeed,
    stream: Lcg,
}

impl WebGlNoise {
    pub fn new(seed: NoiseSeed) -> Self {
        Self {
            seed,
            stream: Lcg::new(seed),
        }
    }

    /// Perturb every byte of `buffer` by up to `level * 255`.
    pub fn apply_buffer(&mut self, buffer: &mut [u8], level: f64) {
        let level = sanitize_level(level);
        if level == 0.0 {
            return;
        }
        for byte in buffer.iter_mut() {
            let delta = (self.stream.next_offset(level) * 255.0).round() as i32;
            *byte = clamp_byte(i32::from(*byte) + delta);
        }
    }

    /// `value` plus an offset in `[-level, level]`.
    pub fn float_noise(&mut self, value: f64, level: f64) -> f64 {
        value + self.stream.next_offset(sanitize_level(level))
    }

    /// `value` plus an offset of at most `level * 100`.
    pub fn int_noise(&mut self, value: i64, level: f64) -> i64 {
        let offset = self.stream.next_offset(sanitize_level(level)) * INT_SCALE;
        value.saturating_add(offset.round() as i64)
    }
}

impl NoiseGenerator for WebGlNoise {
    fn seed(&self) -> NoiseSeed {
        self.seed
    }

    fn apply(&mut self, data: &mut [u8], _width: u32, level: f64) {
        self.apply_buffer(data, level);
    }
}
