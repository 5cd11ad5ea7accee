//! Host integration facade.
//!
//! Native hooks talk to one [`Shield`]. For every call it:
//!
//! 1. checks the registry's global toggle and the context config's master
//!    switch, and returns the real value untouched if either is off,
//! 2. reports the operation to the canvas or WebGL usage detector,
//! 3. derives the noise seed from the surface, the config hash and the
//!    content, and spoofs outside any lock,
//! 4. bumps the matching registry counters.
//!
//! The per-surface spoofing rules live in [`canvas`], [`webgl`] and
//! [`navigator`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fingerprint_shield::noise::SeedDeriver;
//! use fingerprint_shield::registry::FingerprintRegistry;
//! use fingerprint_shield::stealth::Shield;
//!
//! let shield = Shield::new(Arc::new(FingerprintRegistry::new()), SeedDeriver::from_key("demo"));
//!
//! let mut pixels = vec![200u8; 4 * 64 * 64];
//! shield.canvas_image_data("tab-1", "canvas-1", &mut pixels, 64);
//!
//! // Navigator values resolve through the same registry.
//! let config = shield.registry().get_config("tab-1");
//! assert_eq!(config.overrides().webdriver(), Some(false));
//! ```

pub mod canvas;
pub mod navigator;
pub mod webgl;

pub use canvas::CanvasShield;
pub use navigator::SurfaceOverrides;
pub use webgl::{ParameterValue, ShaderPrecision, WebGlShield};

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{CatalogError, ConfigError, ShieldSettings};
use crate::detection::{CanvasUsageDetector, Observation, WebGlUsageDetector};
use crate::gl::{PrecisionType, TextureFormat};
use crate::noise::{SeedDeriver, TextMetrics};
use crate::registry::{FingerprintRegistry, ResolvedConfig, Stat};

/// Failure building a [`Shield`] from startup settings.
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Spoofing and detection entry point for one host process.
pub struct Shield {
    registry: Arc<FingerprintRegistry>,
    canvas: CanvasUsageDetector,
    webgl: WebGlUsageDetector,
    seeds: SeedDeriver,
}

impl Shield {
    pub fn new(registry: Arc<FingerprintRegistry>, seeds: SeedDeriver) -> Self {
        Self {
            registry,
            canvas: CanvasUsageDetector::new(),
            webgl: WebGlUsageDetector::new(),
            seeds,
        }
    }

    /// Build a shield from validated startup settings: load the default
    /// config and both catalogs, set the toggle and pick the session key.
    pub fn from_settings(settings: &ShieldSettings) -> Result<Self, ShieldError> {
        settings.validate()?;

        let registry = FingerprintRegistry::new();
        if let Some(path) = &settings.config_path {
            registry.load_config_file(path)?;
        }
        if let Some(path) = &settings.device_profiles_path {
            registry.load_device_profiles_file(path)?;
        }
        if let Some(path) = &settings.behavior_patterns_path {
            registry.load_behavior_patterns_file(path)?;
        }
        registry.set_enabled(settings.enabled);

        let seeds = match &settings.session_key {
            Some(key) => SeedDeriver::from_key(key),
            None => {
                debug!("No session key configured, using a random one");
                SeedDeriver::random()
            }
        };

        info!(
            "Fingerprint shield ready (protection {})",
            if settings.enabled { "on" } else { "off" }
        );
        Ok(Self::new(Arc::new(registry), seeds))
    }

    pub fn registry(&self) -> &Arc<FingerprintRegistry> {
        &self.registry
    }

    pub fn canvas_detector(&self) -> &CanvasUsageDetector {
        &self.canvas
    }

    pub fn webgl_detector(&self) -> &WebGlUsageDetector {
        &self.webgl
    }

    /// Config to spoof with, or `None` when protection is off for the context.
    fn active(&self, context_id: &str) -> Option<Arc<ResolvedConfig>> {
        if !self.registry.is_enabled() {
            return None;
        }
        let config = self.registry.get_config(context_id);
        if config.enabled {
            Some(config)
        } else {
            None
        }
    }

    fn note(&self, observation: Observation) {
        if observation.flagged && observation.transitioned {
            self.registry.record(Stat::FingerprintingAttemptsDetected);
        }
    }

    fn observe_canvas(&self, surface_id: &str, operation: &str, parameters: &str) {
        let observation = self
            .canvas
            .record_at(surface_id, operation, parameters, Instant::now());
        self.note(observation);
    }

    fn observe_webgl(&self, surface_id: &str, operation: &str, parameters: &str) {
        let observation = self
            .webgl
            .record_at(surface_id, operation, parameters, Instant::now());
        self.note(observation);
    }

    // ========================================================================
    // Canvas
    // ========================================================================

    /// Report a canvas call that needs no spoofing (`fillRect`, `drawImage`, ...).
    pub fn canvas_operation(&self, context_id: &str, surface_id: &str, operation: &str, parameters: &str) {
        if self.active(context_id).is_some() {
            self.observe_canvas(surface_id, operation, parameters);
        }
    }

    /// `getImageData`: perturb `pixels` (RGBA, `width` pixels per row) in place.
    pub fn canvas_image_data(
        &self,
        context_id: &str,
        surface_id: &str,
        pixels: &mut [u8],
        width: u32,
    ) -> bool {
        let Some(config) = self.active(context_id) else {
            return false;
        };
        self.observe_canvas(surface_id, "getImageData", "");

        let seed = self.seeds.derive(surface_id, &config.hash(), pixels);
        let applied = CanvasShield::new(&config.canvas).protect_image_data(seed, pixels, width);
        if applied {
            self.registry.record(Stat::CanvasOperationsSpoofed);
        }
        applied
    }

    /// `toDataURL`: the export to hand back instead, or `None` for the original.
    pub fn canvas_data_url(&self, context_id: &str, surface_id: &str, data_url: &str) -> Option<String> {
        let config = self.active(context_id)?;
        self.observe_canvas(surface_id, "toDataURL", "");

        let hash = config.hash();
        let spoofed = CanvasShield::new(&config.canvas)
            .protect_data_url(data_url, |pixels| self.seeds.derive(surface_id, &hash, pixels))?;
        self.registry.record(Stat::CanvasOperationsSpoofed);
        Some(spoofed)
    }

    /// `measureText(text)`: jittered metrics, stable for the same text.
    pub fn canvas_text_metrics(
        &self,
        context_id: &str,
        surface_id: &str,
        text: &str,
        metrics: TextMetrics,
    ) -> TextMetrics {
        let Some(config) = self.active(context_id) else {
            return metrics;
        };
        self.observe_canvas(surface_id, "measureText", text);

        let seed = self.seeds.derive(surface_id, &config.hash(), text.as_bytes());
        let spoofed = CanvasShield::new(&config.canvas).text_metrics(seed, metrics);
        if spoofed != metrics {
            self.registry.record(Stat::CanvasOperationsSpoofed);
        }
        spoofed
    }

    // ========================================================================
    // WebGL
    // ========================================================================

    /// Report a WebGL call that needs no spoofing (`drawArrays`, `bindBuffer`, ...).
    pub fn webgl_operation(&self, context_id: &str, surface_id: &str, operation: &str, parameters: &str) {
        if self.active(context_id).is_some() {
            self.observe_webgl(surface_id, operation, parameters);
        }
    }

    /// `getParameter(id)`, with `id` in any spelling the page might use.
    pub fn webgl_parameter(&self, context_id: &str, surface_id: &str, id: &str) -> Option<ParameterValue> {
        let config = self.active(context_id)?;
        self.observe_webgl(surface_id, "getParameter", id);

        let value = WebGlShield::new(&config.webgl).parameter_by_name(id)?;
        self.registry.record(Stat::WebglParametersSpoofed);
        Some(value)
    }

    /// `getSupportedExtensions()`.
    pub fn webgl_extensions(&self, context_id: &str, surface_id: &str) -> Option<Vec<String>> {
        let config = self.active(context_id)?;
        self.observe_webgl(surface_id, "getSupportedExtensions", "");
        let extensions = WebGlShield::new(&config.webgl).extensions()?;
        self.registry.record(Stat::WebglParametersSpoofed);
        Some(extensions)
    }

    /// `getExtension(name)`: whether the extension may be handed out.
    pub fn webgl_allows_extension(&self, context_id: &str, surface_id: &str, name: &str) -> bool {
        let Some(config) = self.active(context_id) else {
            return true;
        };
        self.observe_webgl(surface_id, "getExtension", name);
        WebGlShield::new(&config.webgl).allows_extension(name)
    }

    /// `getShaderPrecisionFormat(shader, type)`.
    pub fn webgl_shader_precision(
        &self,
        context_id: &str,
        surface_id: &str,
        precision_type: PrecisionType,
    ) -> Option<ShaderPrecision> {
        let config = self.active(context_id)?;
        self.observe_webgl(surface_id, "getShaderPrecisionFormat", "");
        let precision = WebGlShield::new(&config.webgl).shader_precision(precision_type)?;
        self.registry.record(Stat::WebglParametersSpoofed);
        Some(precision)
    }

    /// `bufferData`: perturb the uploaded bytes in place.
    pub fn webgl_buffer(&self, context_id: &str, surface_id: &str, data: &mut [u8]) -> bool {
        let Some(config) = self.active(context_id) else {
            return false;
        };
        self.observe_webgl(surface_id, "bufferData", "");

        let seed = self.seeds.derive(surface_id, &config.hash(), data);
        let applied = WebGlShield::new(&config.webgl).protect_buffer(seed, data);
        if applied {
            self.registry.record(Stat::WebglParametersSpoofed);
        }
        applied
    }

    /// `readPixels` / texture readback: perturb texel bytes in place.
    pub fn webgl_texture(
        &self,
        context_id: &str,
        surface_id: &str,
        data: &mut [u8],
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> bool {
        let Some(config) = self.active(context_id) else {
            return false;
        };
        self.observe_webgl(surface_id, "texImage2D", "");

        let seed = self.seeds.derive(surface_id, &config.hash(), data);
        let applied =
            WebGlShield::new(&config.webgl).protect_texture(seed, data, width, height, format);
        if applied {
            self.registry.record(Stat::WebglParametersSpoofed);
        }
        applied
    }

    // ========================================================================
    // Surfaces
    // ========================================================================

    /// Whether either detector currently flags `surface_id`.
    pub fn is_fingerprinting(&self, surface_id: &str) -> bool {
        self.canvas.classify(surface_id) || self.webgl.classify(surface_id)
    }

    /// Drop detector state for a destroyed surface.
    pub fn release_surface(&self, surface_id: &str) {
        let canvas = self.canvas.evict(surface_id);
        let webgl = self.webgl.evict(surface_id);
        if canvas || webgl {
            debug!("Released surface '{}'", surface_id);
        }
    }
}
