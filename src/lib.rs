//! # Fingerprint Shield
//!
//! Deterministic fingerprint spoofing and fingerprinting detection for
//! browser-exposed surfaces, written in Rust.
//!
//! Fingerprint Shield sits between a browser engine's native hooks and the
//! page. It decides what a page sees when it reads canvas pixels, WebGL
//! parameters and buffers, or navigator/screen/timezone/geolocation values,
//! and it watches how pages use those surfaces to spot active probing.
//!
//! ## Features
//!
//! - **Validated Configuration**: per-surface spoofing settings with full
//!   validation, merge and a content hash
//! - **Seeded Noise**: coherent pixel noise and buffer noise that is
//!   bit-identical within a session and differs across sessions
//! - **Usage Detection**: bounded, incremental heuristics that flag canvas and
//!   WebGL fingerprinting patterns per surface
//! - **Registry**: per-context config resolution, device profile and behavior
//!   pattern catalogs, aggregate statistics
//! - **Flexible Settings**: TOML/JSON files, environment variables, CLI arguments
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use fingerprint_shield::prelude::*;
//!
//! let registry = Arc::new(FingerprintRegistry::new());
//! let shield = Shield::new(registry.clone(), SeedDeriver::from_key("session"));
//!
//! // A canvas read in tab-1 gets noise; the detector sees the read.
//! let mut pixels = vec![255u8; 4 * 32 * 32];
//! shield.canvas_image_data("tab-1", "canvas-1", &mut pixels, 32);
//!
//! println!("{:?}", registry.get_statistics());
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: fingerprint configs, catalogs and host settings
//! - [`noise`]: seed derivation and the canvas/WebGL noise generators
//! - [`detection`]: per-surface usage detectors
//! - [`registry`]: config resolution and statistics
//! - [`stealth`]: the [`Shield`](stealth::Shield) facade and per-surface spoofing
//! - [`gl`]: WebGL parameter identifiers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Host hooks                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     ┌───────────────┐                           │
//! │                     │    Shield     │                           │
//! │                     └───────┬───────┘                           │
//! │        ┌────────────────────┼────────────────────┐              │
//! │   ┌────┴─────┐        ┌─────┴─────┐        ┌─────┴─────┐        │
//! │   │ Registry │        │   Noise   │        │ Detection │        │
//! │   └────┬─────┘        └───────────┘        └───────────┘        │
//! │        │                                                        │
//! │   ┌────┴─────┐                                                  │
//! │   │  Config  │                                                  │
//! │   └──────────┘                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//!
//! Host settings follow a precedence chain:
//! 1. Default values
//! 2. Settings file (TOML/JSON)
//! 3. Environment variables (`FP_SHIELD_*`)
//! 4. CLI arguments
//!
//! See [`config::ShieldSettings`] for all available options.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string with name
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Module Exports
// ============================================================================

/// Fingerprint configs, device profiles, behavior patterns and host settings.
pub mod config;

/// WebGL parameter, precision and texture format identifiers.
pub mod gl;

/// Seed derivation and deterministic canvas/WebGL noise.
pub mod noise;

/// Per-surface fingerprinting usage detectors.
pub mod detection;

/// Per-context config resolution, catalogs and statistics.
pub mod registry;

/// Host integration facade and per-surface spoofing rules.
pub mod stealth;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

// Config types
pub use config::{
    BehaviorPattern, CliArgs, ConfigError, ConfigHash, DeviceProfile, FingerprintConfig,
    ShieldSettings, ValidationError, ValidationIssue,
};

// Noise types
pub use noise::{CanvasNoise, NoiseGenerator, NoiseSeed, SeedDeriver, TextMetrics, WebGlNoise};

// Detection types
pub use detection::{
    CanvasUsageDetector, Heuristic, SurfaceState, UsageDetector, Verdict, WebGlUsageDetector,
};

// Registry types
pub use registry::{FingerprintRegistry, ResolvedConfig, Stat, Statistics};

// Stealth types
pub use stealth::{CanvasShield, ParameterValue, Shield, ShieldError, SurfaceOverrides, WebGlShield};

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use fingerprint_shield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{FingerprintConfig, ShieldSettings};
    pub use crate::detection::{CanvasUsageDetector, WebGlUsageDetector};
    pub use crate::noise::{CanvasNoise, SeedDeriver, WebGlNoise};
    pub use crate::registry::{FingerprintRegistry, Stat};
    pub use crate::stealth::Shield;
    pub use crate::{FULL_VERSION, NAME, VERSION};
}
