//! WebGL spoofing surface.
//!
//! Native hooks call into [`WebGlShield`] with the parameter the page asked
//! for, the buffer it uploaded, or the texture it read back. Identity strings
//! and capability limits come from [`WebGlConfig`]; buffers and textures get
//! seeded [`WebGlNoise`].
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::config::WebGlConfig;
//! use fingerprint_shield::gl::GlParameter;
//! use fingerprint_shield::stealth::webgl::{ParameterValue, WebGlShield};
//!
//! let config = WebGlConfig::default().with_gpu("Apple Inc.", "Apple M2");
//! let shield = WebGlShield::new(&config);
//!
//! assert_eq!(
//!     shield.parameter(GlParameter::UnmaskedRenderer),
//!     Some(ParameterValue::String("Apple M2".to_string()))
//! );
//! ```

use std::fmt;

use crate::config::WebGlConfig;
use crate::gl::{GlParameter, PrecisionType, TextureFormat};
use crate::noise::{NoiseSeed, WebGlNoise};

/// Extensions a stock desktop Chrome reports.
const STANDARD_EXTENSIONS: [&str; 16] = [
    "ANGLE_instanced_arrays",
    "EXT_blend_minmax",
    "EXT_color_buffer_half_float",
    "EXT_disjoint_timer_query",
    "EXT_float_blend",
    "EXT_frag_depth",
    "EXT_shader_texture_lod",
    "EXT_texture_filter_anisotropic",
    "OES_element_index_uint",
    "OES_standard_derivatives",
    "OES_texture_float",
    "OES_texture_half_float",
    "OES_vertex_array_object",
    "WEBGL_debug_renderer_info",
    "WEBGL_debug_shaders",
    "WEBGL_lose_context",
];

/// Extensions that leak the real GPU or driver.
const REVEALING_EXTENSIONS: [&str; 3] = [
    "WEBGL_debug_renderer_info",
    "WEBGL_debug_shaders",
    "EXT_disjoint_timer_query",
];

const MAX_TEXTURE_SIZE: i64 = 16384;
const MAX_VERTEX_ATTRIBS: i64 = 16;
const MAX_VERTEX_UNIFORM_VECTORS: i64 = 1024;
const MAX_FRAGMENT_UNIFORM_VECTORS: i64 = 1024;
const MAX_VARYING_VECTORS: i64 = 30;
const MAX_VIEWPORT_DIMS: [i64; 2] = [16384, 16384];

/// Extension list to report: the standard set minus revealing entries, then
/// configured extras in order, without duplicates.
pub fn supported_extensions(config: &WebGlConfig) -> Vec<String> {
    let mut extensions: Vec<String> = STANDARD_EXTENSIONS
        .iter()
        .filter(|ext| !REVEALING_EXTENSIONS.contains(*ext))
        .map(|ext| ext.to_string())
        .collect();
    for ext in &config.extensions {
        if !extensions.contains(ext) {
            extensions.push(ext.clone());
        }
    }
    extensions
}

/// A spoofed `getParameter` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Int(i64),
    String(String),
    IntPair([i64; 2]),
}

impl ParameterValue {
    fn from_override(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(value) => ParameterValue::Int(value),
            Err(_) => ParameterValue::String(raw.to_string()),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(value) => write!(f, "{}", value),
            ParameterValue::String(value) => f.write_str(value),
            ParameterValue::IntPair([a, b]) => write!(f, "[{}, {}]", a, b),
        }
    }
}

/// `getShaderPrecisionFormat` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderPrecision {
    pub range_min: i32,
    pub range_max: i32,
    pub precision: i32,
}

/// IEEE single precision for every float type, 32-bit ints for every int type.
pub fn shader_precision(precision_type: PrecisionType) -> ShaderPrecision {
    if precision_type.is_float() {
        ShaderPrecision {
            range_min: 127,
            range_max: 127,
            precision: 23,
        }
    } else {
        ShaderPrecision {
            range_min: 31,
            range_max: 30,
            precision: 0,
        }
    }
}

/// Spoofed value for `parameter`, or `None` to pass the real one through.
///
/// Entries in `config.parameters` win; their keys may use any spelling
/// [`GlParameter::parse`] accepts.
pub fn spoofed_parameter(parameter: GlParameter, config: &WebGlConfig) -> Option<ParameterValue> {
    if !config.enabled {
        return None;
    }

    let overridden = config
        .parameters
        .iter()
        .find(|(key, _)| GlParameter::parse(key) == Some(parameter));
    if let Some((_, raw)) = overridden {
        return Some(ParameterValue::from_override(raw));
    }

    let value = match parameter {
        GlParameter::Vendor | GlParameter::UnmaskedVendor => {
            ParameterValue::String(config.vendor.clone())
        }
        GlParameter::Renderer | GlParameter::UnmaskedRenderer => {
            ParameterValue::String(config.renderer.clone())
        }
        GlParameter::Version => ParameterValue::String(config.version.clone()),
        GlParameter::ShadingLanguageVersion => {
            ParameterValue::String(config.shading_language_version.clone())
        }
        GlParameter::MaxTextureSize
        | GlParameter::MaxCubeMapTextureSize
        | GlParameter::MaxRenderbufferSize => ParameterValue::Int(MAX_TEXTURE_SIZE),
        GlParameter::MaxVertexAttribs => ParameterValue::Int(MAX_VERTEX_ATTRIBS),
        GlParameter::MaxVertexUniformVectors => ParameterValue::Int(MAX_VERTEX_UNIFORM_VECTORS),
        GlParameter::MaxFragmentUniformVectors => {
            ParameterValue::Int(MAX_FRAGMENT_UNIFORM_VECTORS)
        }
        GlParameter::MaxVaryingVectors => ParameterValue::Int(MAX_VARYING_VECTORS),
        GlParameter::MaxViewportDims => ParameterValue::IntPair(MAX_VIEWPORT_DIMS),
    };
    Some(value)
}

/// Number of texel bytes in a `width` x `height` texture, capped at `available`.
fn texture_len(width: u32, height: u32, format: TextureFormat, available: usize) -> usize {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|texels| texels.checked_mul(format.bytes_per_pixel()))
        .map_or(available, |len| len.min(available))
}

/// WebGL spoofing for one config.
#[derive(Debug, Clone, Copy)]
pub struct WebGlShield<'a> {
    config: &'a WebGlConfig,
}

impl<'a> WebGlShield<'a> {
    pub fn new(config: &'a WebGlConfig) -> Self {
        Self { config }
    }

    pub fn parameter(&self, parameter: GlParameter) -> Option<ParameterValue> {
        spoofed_parameter(parameter, self.config)
    }

    /// Like [`parameter`](Self::parameter), for a raw id as the page passed it.
    pub fn parameter_by_name(&self, raw: &str) -> Option<ParameterValue> {
        GlParameter::parse(raw).and_then(|parameter| self.parameter(parameter))
    }

    pub fn extensions(&self) -> Option<Vec<String>> {
        self.config.enabled.then(|| supported_extensions(self.config))
    }

    /// `getExtension(name)` succeeds only for reported extensions.
    pub fn allows_extension(&self, name: &str) -> bool {
        !self.config.enabled || supported_extensions(self.config).iter().any(|ext| ext == name)
    }

    pub fn shader_precision(&self, precision_type: PrecisionType) -> Option<ShaderPrecision> {
        self.config
            .enabled
            .then(|| shader_precision(precision_type))
    }

    /// Perturb uploaded buffer contents. Returns whether anything was applied.
    pub fn protect_buffer(&self, seed: NoiseSeed, data: &mut [u8]) -> bool {
        if !self.config.buffer_noise_active() || data.is_empty() {
            return false;
        }
        WebGlNoise::new(seed).apply_buffer(data, self.config.buffer_noise_level);
        true
    }

    /// Perturb texel data. Only the first `width * height * bpp` bytes are
    /// touched; trailing padding stays as it was.
    pub fn protect_texture(
        &self,
        seed: NoiseSeed,
        data: &mut [u8],
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> bool {
        let len = texture_len(width, height, format, data.len());
        if !self.config.buffer_noise_active() || len == 0 {
            return false;
        }
        WebGlNoise::new(seed).apply_buffer(&mut data[..len], self.config.buffer_noise_level);
        true
    }

    /// Jitter a float parameter such as a line width range bound.
    pub fn float_parameter(&self, seed: NoiseSeed, value: f64) -> f64 {
        if !self.config.buffer_noise_active() {
            return value;
        }
        WebGlNoise::new(seed).float_noise(value, self.config.buffer_noise_level)
    }
}
