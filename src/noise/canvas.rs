//! Canvas pixel noise.
//!
//! Pixels get smoothstep-interpolated gradient noise sampled at
//! `(x * 0.1, y * 0.1)`. Neighbouring pixels move together, so the result has
//! no salt-and-pepper speckle a detector could filter out. The seed picks the
//! lattice gradients and each colour channel gets its own field. Alpha is
//! never touched.

use super::{clamp_byte, mix, sanitize_level, Lcg, NoiseGenerator, NoiseSeed};

/// Spatial frequency of the noise field.
const FREQUENCY: f64 = 0.1;

/// Channel delta at noise level 1.0 scales the unit noise by this much.
const AMPLITUDE: f64 = 10.0;

/// Alpha channel index in RGBA data.
const ALPHA: usize = 3;

/// Max absolute offset applied to a reported text width.
const TEXT_WIDTH_JITTER: f64 = 0.05;

/// Max absolute offset applied to each bounding box edge.
const TEXT_BOX_JITTER: f64 = 0.025;

/// Result of a `measureText` call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f64,
    pub actual_bounding_box_left: f64,
    pub actual_bounding_box_right: f64,
    pub actual_bounding_box_ascent: f64,
    pub actual_bounding_box_descent: f64,
}

/// Seeded canvas noise generator.
#[derive(Debug, Clone)]
pub struct CanvasNoise {
    seed: NoiseSeed,
    stream: Lcg,
}

impl CanvasNoise {
    pub fn new(seed: NoiseSeed) -> Self {
        Self {
            seed,
            stream: Lcg::new(seed),
        }
    }

    /// Gradient noise at `(x, y)` for `channel`, roughly in `[-1, 1]`.
    pub fn perlin(&self, x: f64, y: f64, channel: u8) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = (x0 as i64 & 255) as u32;
        let yi = (y0 as i64 & 255) as u32;
        let xf = x - x0;
        let yf = y - y0;

        let u = fade(xf);
        let v = fade(yf);

        let aa = self.corner(xi, yi, channel);
        let ba = self.corner((xi + 1) & 255, yi, channel);
        let ab = self.corner(xi, (yi + 1) & 255, channel);
        let bb = self.corner((xi + 1) & 255, (yi + 1) & 255, channel);

        let x1 = lerp(u, grad(aa, xf, yf), grad(ba, xf - 1.0, yf));
        let x2 = lerp(u, grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0));
        lerp(v, x1, x2)
    }

    fn corner(&self, xi: u32, yi: u32, channel: u8) -> u32 {
        let salt = u32::from(channel).wrapping_mul(0x9e37_79b9);
        mix(self.seed.0 ^ salt, xi | (yi << 8))
    }

    /// Signed channel delta for pixel `(x, y)` at `level`.
    pub fn pixel_delta(&self, x: u32, y: u32, channel: u8, level: f64) -> i32 {
        let level = sanitize_level(level);
        if level == 0.0 {
            return 0;
        }
        let n = self.perlin(f64::from(x) * FREQUENCY, f64::from(y) * FREQUENCY, channel);
        (n * level * AMPLITUDE).round() as i32
    }

    /// Perturbed value of one channel byte. Alpha comes back unchanged.
    pub fn perturb_channel(&self, x: u32, y: u32, channel: u8, value: u8, level: f64) -> u8 {
        if usize::from(channel) >= ALPHA {
            return value;
        }
        clamp_byte(i32::from(value) + self.pixel_delta(x, y, channel, level))
    }

    /// Perturb RGBA pixel data in place.
    ///
    /// `width` is the row length in pixels. A zero width, a zero level or an
    /// empty buffer leaves the data alone, as do trailing bytes that do not
    /// form a whole pixel.
    pub fn apply_rgba(&self, pixels: &mut [u8], width: u32, level: f64) {
        let level = sanitize_level(level);
        if width == 0 || level == 0.0 {
            return;
        }
        let width = u64::from(width);

        for (index, pixel) in pixels.chunks_exact_mut(4).enumerate() {
            let index = index as u64;
            let x = (index % width) as u32;
            let y = (index / width) as u32;
            for channel in 0..ALPHA {
                pixel[channel] =
                    self.perturb_channel(x, y, channel as u8, pixel[channel], level);
            }
        }
    }

    /// Coherent float noise at `(x, y)`, in roughly `[-level, level]`.
    pub fn float_noise(&self, x: f64, y: f64, level: f64) -> f64 {
        self.perlin(x * FREQUENCY, y * FREQUENCY, 0) * sanitize_level(level)
    }

    /// Next offset in `[-level, level]` from the seeded stream.
    pub fn next_offset(&mut self, level: f64) -> f64 {
        self.stream.next_offset(sanitize_level(level))
    }

    /// Jitter text metrics. Width moves by at most 0.05, each bounding box
    /// edge by at most 0.025.
    pub fn perturb_text_metrics(&mut self, metrics: TextMetrics) -> TextMetrics {
        TextMetrics {
            width: metrics.width + self.stream.next_offset(TEXT_WIDTH_JITTER),
            actual_bounding_box_left: metrics.actual_bounding_box_left
                + self.stream.next_offset(TEXT_BOX_JITTER),
            actual_bounding_box_right: metrics.actual_bounding_box_right
                + self.stream.next_offset(TEXT_BOX_JITTER),
            actual_bounding_box_ascent: metrics.actual_bounding_box_ascent
                + self.stream.next_offset(TEXT_BOX_JITTER),
            actual_bounding_box_descent: metrics.actual_bounding_box_descent
                + self.stream.next_offset(TEXT_BOX_JITTER),
        }
    }
}

impl NoiseGenerator for CanvasNoise {
    fn seed(&self) -> NoiseSeed {
        self.seed
    }

    fn apply(&mut self, data: &mut [u8], width: u32, level: f64) {
        self.apply_rgba(data, width, level);
    }
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

#[inline]
fn grad(hash: u32, x: f64, y: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        0.0
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}
