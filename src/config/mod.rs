//! Configuration for fingerprint-shield.
//!
//! Two layers live here:
//! - [`FingerprintConfig`] and its per-surface records: *what* to spoof and
//!   how strongly, with validation, merge and a content hash.
//! - [`ShieldSettings`]: host startup settings (config and catalog files,
//!   session key, initial toggle) loaded from files, env and CLI.
//!
//! Named [`DeviceProfile`]s and [`BehaviorPattern`]s are parsed from catalog
//! documents by [`parse_catalog`].
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::config::FingerprintConfig;
//!
//! let config = FingerprintConfig::from_json(r#"{"canvas": {"noise_level": 0.2}}"#).unwrap();
//! assert!(config.validate().is_ok());
//! println!("config hash: {}", config.hash());
//! ```

mod catalog;
mod fingerprint;
mod settings;
mod surfaces;

pub use catalog::{
    parse_catalog, BehaviorPattern, CatalogEntry, CatalogError, DeviceProfile,
    InteractionBehavior, KeyboardBehavior, MouseBehavior, ScrollBehavior,
};
pub use fingerprint::{
    ConfigHash, FingerprintConfig, ValidationError, ValidationIssue, CONFIG_VERSION,
};
pub use settings::{CliArgs, ConfigError, ShieldSettings};
pub use surfaces::{
    AntiDetectionConfig, AudioConfig, AutomationProtection, CanvasConfig, FontConfig,
    GeolocationConfig, JsInjectionProtection, NavigatorConfig, ScreenConfig, TimezoneConfig,
    WebDriverProtection, WebGlConfig, WebRtcConfig, DEFAULT_USER_AGENT,
};
