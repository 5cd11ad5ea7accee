//! WebGL parameter identifiers.
//!
//! Host hooks report parameters however the page asked for them: as a hex
//! enum (`0x1F00`), a decimal enum (`7936`), or a name with or without the
//! `GL_` prefix. [`GlParameter::parse`] folds all of those onto one value.

use std::fmt;
use std::str::FromStr;

/// `getParameter` names this crate knows how to spoof or watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlParameter {
    Vendor,
    Renderer,
    Version,
    ShadingLanguageVersion,
    UnmaskedVendor,
    UnmaskedRenderer,
    MaxTextureSize,
    MaxCubeMapTextureSize,
    MaxRenderbufferSize,
    MaxVertexAttribs,
    MaxVertexUniformVectors,
    MaxFragmentUniformVectors,
    MaxVaryingVectors,
    MaxViewportDims,
}

impl GlParameter {
    pub const ALL: [GlParameter; 14] = [
        GlParameter::Vendor,
        GlParameter::Renderer,
        GlParameter::Version,
        GlParameter::ShadingLanguageVersion,
        GlParameter::UnmaskedVendor,
        GlParameter::UnmaskedRenderer,
        GlParameter::MaxTextureSize,
        GlParameter::MaxCubeMapTextureSize,
        GlParameter::MaxRenderbufferSize,
        GlParameter::MaxVertexAttribs,
        GlParameter::MaxVertexUniformVectors,
        GlParameter::MaxFragmentUniformVectors,
        GlParameter::MaxVaryingVectors,
        GlParameter::MaxViewportDims,
    ];

    /// The GLenum value.
    pub fn code(self) -> u32 {
        match self {
            GlParameter::Vendor => 0x1F00,
            GlParameter::Renderer => 0x1F01,
            GlParameter::Version => 0x1F02,
            GlParameter::ShadingLanguageVersion => 0x8B8C,
            GlParameter::UnmaskedVendor => 0x9245,
            GlParameter::UnmaskedRenderer => 0x9246,
            GlParameter::MaxTextureSize => 0x0D33,
            GlParameter::MaxCubeMapTextureSize => 0x851C,
            GlParameter::MaxRenderbufferSize => 0x84E8,
            GlParameter::MaxVertexAttribs => 0x8869,
            GlParameter::MaxVertexUniformVectors => 0x8DFB,
            GlParameter::MaxFragmentUniformVectors => 0x8DFD,
            GlParameter::MaxVaryingVectors => 0x8DFC,
            GlParameter::MaxViewportDims => 0x0D3A,
        }
    }

    /// The WebGL constant name.
    pub fn name(self) -> &'static str {
        match self {
            GlParameter::Vendor => "VENDOR",
            GlParameter::Renderer => "RENDERER",
            GlParameter::Version => "VERSION",
            GlParameter::ShadingLanguageVersion => "SHADING_LANGUAGE_VERSION",
            GlParameter::UnmaskedVendor => "UNMASKED_VENDOR_WEBGL",
            GlParameter::UnmaskedRenderer => "UNMASKED_RENDERER_WEBGL",
            GlParameter::MaxTextureSize => "MAX_TEXTURE_SIZE",
            GlParameter::MaxCubeMapTextureSize => "MAX_CUBE_MAP_TEXTURE_SIZE",
            GlParameter::MaxRenderbufferSize => "MAX_RENDERBUFFER_SIZE",
            GlParameter::MaxVertexAttribs => "MAX_VERTEX_ATTRIBS",
            GlParameter::MaxVertexUniformVectors => "MAX_VERTEX_UNIFORM_VECTORS",
            GlParameter::MaxFragmentUniformVectors => "MAX_FRAGMENT_UNIFORM_VECTORS",
            GlParameter::MaxVaryingVectors => "MAX_VARYING_VECTORS",
            GlParameter::MaxViewportDims => "MAX_VIEWPORT_DIMS",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// Parse any accepted spelling. Unknown input gives `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"));
        if let Some(digits) = hex {
            return u32::from_str_radix(digits, 16).ok().and_then(Self::from_code);
        }
        if let Ok(code) = raw.parse::<u32>() {
            return Self::from_code(code);
        }

        let upper = raw.to_ascii_uppercase();
        let name = upper.strip_prefix("GL_").unwrap_or(&upper);
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Identity strings that reveal the GPU.
    ///
    /// The unmasked variants count as their masked counterparts.
    pub fn identity(self) -> Option<GlParameter> {
        match self {
            GlParameter::Vendor | GlParameter::UnmaskedVendor => Some(GlParameter::Vendor),
            GlParameter::Renderer | GlParameter::UnmaskedRenderer => Some(GlParameter::Renderer),
            GlParameter::Version => Some(GlParameter::Version),
            GlParameter::ShadingLanguageVersion => Some(GlParameter::ShadingLanguageVersion),
            _ => None,
        }
    }
}

impl fmt::Display for GlParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GlParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown WebGL parameter: {}", s))
    }
}

/// Shader precision query types (`getShaderPrecisionFormat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionType {
    LowFloat,
    MediumFloat,
    HighFloat,
    LowInt,
    MediumInt,
    HighInt,
}

impl PrecisionType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x8DF0 => Some(PrecisionType::LowFloat),
            0x8DF1 => Some(PrecisionType::MediumFloat),
            0x8DF2 => Some(PrecisionType::HighFloat),
            0x8DF3 => Some(PrecisionType::LowInt),
            0x8DF4 => Some(PrecisionType::MediumInt),
            0x8DF5 => Some(PrecisionType::HighInt),
            _ => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            PrecisionType::LowFloat | PrecisionType::MediumFloat | PrecisionType::HighFloat
        )
    }
}

/// Pixel formats accepted by `texImage2D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Alpha,
    Rgb,
    Rgba,
    Luminance,
    LuminanceAlpha,
}

impl TextureFormat {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x1906 => Some(TextureFormat::Alpha),
            0x1907 => Some(TextureFormat::Rgb),
            0x1908 => Some(TextureFormat::Rgba),
            0x1909 => Some(TextureFormat::Luminance),
            0x190A => Some(TextureFormat::LuminanceAlpha),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Alpha | TextureFormat::Luminance => 1,
            TextureFormat::LuminanceAlpha => 2,
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba => 4,
        }
    }
}
