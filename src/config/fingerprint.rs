//! The root fingerprint configuration.
//!
//! [`FingerprintConfig`] aggregates every per-surface record and adds the
//! three operations the rest of the crate relies on:
//!
//! - [`validate`](FingerprintConfig::validate) reports *every* violated
//!   invariant in one [`ValidationError`].
//! - [`merge`](FingerprintConfig::merge) overlays another config, replacing
//!   enabled sub-configs wholesale. The merged record is built and validated
//!   before it replaces `self`.
//! - [`hash`](FingerprintConfig::hash) is a SHA-256 digest of the canonical
//!   JSON form, excluding the `created_at`/`updated_at` timestamps.
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::config::FingerprintConfig;
//!
//! let mut config = FingerprintConfig::new("work");
//! config.canvas.noise_level = 1.5;
//!
//! let err = config.validate().unwrap_err();
//! assert_eq!(err.issues.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use super::settings::ConfigError;
use super::surfaces::{
    AntiDetectionConfig, AudioConfig, CanvasConfig, FontConfig, GeolocationConfig,
    NavigatorConfig, ScreenConfig, TimezoneConfig, WebGlConfig, WebRtcConfig,
};

/// Current config schema version.
pub const CONFIG_VERSION: &str = "1.0.0";

/// One violated config invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Profile name cannot be empty")]
    EmptyProfileName,

    #[error("User agent cannot be empty when navigator spoofing is enabled")]
    EmptyUserAgent,

    #[error("Screen dimensions must be positive when screen spoofing is enabled (got {width}x{height})")]
    NonPositiveScreen { width: u32, height: u32 },

    #[error("Canvas noise level must be between 0.0 and 1.0 (got {0})")]
    CanvasNoiseLevel(f64),

    #[error("WebGL buffer noise level must be between 0.0 and 1.0 (got {0})")]
    WebGlBufferNoiseLevel(f64),

    #[error("Audio noise level must be between 0.0 and 1.0 (got {0})")]
    AudioNoiseLevel(f64),
}

/// A config failed validation. Lists every violated invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Whether `issue` is among the reported problems.
    pub fn contains(&self, issue: &ValidationIssue) -> bool {
        self.issues.contains(issue)
    }

    /// Reasons as display strings.
    pub fn reasons(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fingerprint config: {}", self.reasons().join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// SHA-256 content digest of a [`FingerprintConfig`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigHash([u8; 32]);

impl ConfigHash {
    /// Wrap a digest computed elsewhere, e.g. one persisted by the host.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigHash({})", self.to_hex())
    }
}

/// Complete spoofing configuration for one browsing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Master switch for this config.
    pub enabled: bool,

    /// Human-readable profile name. Must be non-empty.
    pub profile_name: String,

    /// Name of the device profile this config was built from.
    pub device_profile: String,

    /// Name of the behavior pattern used for interaction timing.
    pub behavior_pattern: String,

    pub canvas: CanvasConfig,
    pub webgl: WebGlConfig,
    pub navigator: NavigatorConfig,
    pub audio: AudioConfig,
    pub font: FontConfig,
    pub webrtc: WebRtcConfig,
    pub geolocation: GeolocationConfig,
    pub screen: ScreenConfig,
    pub timezone: TimezoneConfig,
    pub anti_detection: AntiDetectionConfig,

    /// Extra scripts injected into every document.
    #[serde(alias = "custom_js_injections")]
    pub custom_scripts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    pub version: String,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            profile_name: "default".to_string(),
            device_profile: String::new(),
            behavior_pattern: "normal_user".to_string(),
            canvas: CanvasConfig::default(),
            webgl: WebGlConfig::default(),
            navigator: NavigatorConfig::default(),
            audio: AudioConfig::default(),
            font: FontConfig::default(),
            webrtc: WebRtcConfig::default(),
            geolocation: GeolocationConfig::default(),
            screen: ScreenConfig::default(),
            timezone: TimezoneConfig::default(),
            anti_detection: AntiDetectionConfig::default(),
            custom_scripts: Vec::new(),
            created_at: None,
            updated_at: None,
            version: CONFIG_VERSION.to_string(),
        }
    }
}

/// Borrowed view of everything that identifies a config's content.
#[derive(Serialize)]
struct CanonicalView<'a> {
    enabled: bool,
    profile_name: &'a str,
    device_profile: &'a str,
    behavior_pattern: &'a str,
    canvas: &'a CanvasConfig,
    webgl: &'a WebGlConfig,
    navigator: &'a NavigatorConfig,
    audio: &'a AudioConfig,
    font: &'a FontConfig,
    webrtc: &'a WebRtcConfig,
    geolocation: &'a GeolocationConfig,
    screen: &'a ScreenConfig,
    timezone: &'a TimezoneConfig,
    anti_detection: &'a AntiDetectionConfig,
    custom_scripts: &'a [String],
    version: &'a str,
}

/// Feeds serializer output straight into the hasher.
struct DigestWriter<'a>(&'a mut Sha256);

impl io::Write for DigestWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn noise_level_valid(level: f64) -> bool {
    (0.0..=1.0).contains(&level)
}

impl FingerprintConfig {
    /// Create a default config with the given profile name, stamped now.
    pub fn new(profile_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            profile_name: profile_name.into(),
            created_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        }
    }

    /// Check every invariant and report all violations at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.profile_name.is_empty() {
            issues.push(ValidationIssue::EmptyProfileName);
        }
        if self.navigator.enabled && self.navigator.user_agent.is_empty() {
            issues.push(ValidationIssue::EmptyUserAgent);
        }
        if self.screen.enabled && (self.screen.width == 0 || self.screen.height == 0) {
            issues.push(ValidationIssue::NonPositiveScreen {
                width: self.screen.width,
                height: self.screen.height,
            });
        }
        if !noise_level_valid(self.canvas.noise_level) {
            issues.push(ValidationIssue::CanvasNoiseLevel(self.canvas.noise_level));
        }
        if !noise_level_valid(self.webgl.buffer_noise_level) {
            issues.push(ValidationIssue::WebGlBufferNoiseLevel(
                self.webgl.buffer_noise_level,
            ));
        }
        if !noise_level_valid(self.audio.noise_level) {
            issues.push(ValidationIssue::AudioNoiseLevel(self.audio.noise_level));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Whether this config passes [`validate`](Self::validate).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// SHA-256 over the canonical JSON form, timestamps excluded.
    pub fn hash(&self) -> ConfigHash {
        let view = CanonicalView {
            enabled: self.enabled,
            profile_name: &self.profile_name,
            device_profile: &self.device_profile,
            behavior_pattern: &self.behavior_pattern,
            canvas: &self.canvas,
            webgl: &self.webgl,
            navigator: &self.navigator,
            audio: &self.audio,
            font: &self.font,
            webrtc: &self.webrtc,
            geolocation: &self.geolocation,
            screen: &self.screen,
            timezone: &self.timezone,
            anti_detection: &self.anti_detection,
            custom_scripts: &self.custom_scripts,
            version: &self.version,
        };

        let mut hasher = Sha256::new();
        if let Err(e) = serde_json::to_writer(DigestWriter(&mut hasher), &view) {
            // Plain data with string keys; only reachable through a serde bug.
            tracing::error!("Failed to serialize config for hashing: {}", e);
        }
        ConfigHash(hasher.finalize().into())
    }

    /// Equal content, ignoring timestamps.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }

    /// The result of overlaying `other` on `self`, without validation.
    ///
    /// Enabled sub-configs in `other` replace ours wholesale. Names are taken
    /// from `other` only when non-empty. Custom scripts are appended. An
    /// overlay with identical content only refreshes `updated_at`.
    pub fn merged_with(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.updated_at = Some(Utc::now());

        if self.content_eq(other) {
            return merged;
        }

        if other.canvas.enabled {
            merged.canvas = other.canvas.clone();
        }
        if other.webgl.enabled {
            merged.webgl = other.webgl.clone();
        }
        if other.navigator.enabled {
            merged.navigator = other.navigator.clone();
        }
        if other.audio.enabled {
            merged.audio = other.audio.clone();
        }
        if other.font.enabled {
            merged.font = other.font.clone();
        }
        if other.webrtc.enabled {
            merged.webrtc = other.webrtc.clone();
        }
        if other.geolocation.enabled {
            merged.geolocation = other.geolocation.clone();
        }
        if other.screen.enabled {
            merged.screen = other.screen.clone();
        }
        if other.timezone.enabled {
            merged.timezone = other.timezone.clone();
        }
        if other.anti_detection.enabled {
            merged.anti_detection = other.anti_detection.clone();
        }

        if !other.profile_name.is_empty() {
            merged.profile_name = other.profile_name.clone();
        }
        if !other.device_profile.is_empty() {
            merged.device_profile = other.device_profile.clone();
        }
        if !other.behavior_pattern.is_empty() {
            merged.behavior_pattern = other.behavior_pattern.clone();
        }

        merged
            .custom_scripts
            .extend(other.custom_scripts.iter().cloned());

        merged
    }

    /// Overlay `other` onto `self`.
    ///
    /// The merged record is validated first; on failure `self` is untouched.
    pub fn merge(&mut self, other: &Self) -> Result<(), ValidationError> {
        let merged = self.merged_with(other);
        merged.validate()?;
        *self = merged;
        Ok(())
    }

    /// Set `updated_at` to now, and `created_at` too if it was never set.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }

    /// Parse from JSON. Missing fields default, unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a `.json` or `.toml` file. Does not validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match extension_of(path).as_str() {
            "json" => Self::from_json(&content),
            "toml" => Ok(toml::from_str(&content)?),
            ext => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Save to a `.json` or `.toml` file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match extension_of(path).as_str() {
            "json" => self.to_json_pretty()?,
            "toml" => toml::to_string_pretty(self)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };
        fs::write(path, content)?;
        Ok(())
    }

    pub fn with_profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = name.into();
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasConfig) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_webgl(mut self, webgl: WebGlConfig) -> Self {
        self.webgl = webgl;
        self
    }

    pub fn with_navigator(mut self, navigator: NavigatorConfig) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_screen(mut self, screen: ScreenConfig) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_custom_script(mut self, script: impl Into<String>) -> Self {
        self.custom_scripts.push(script.into());
        self
    }
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn without_timestamps(mut config: FingerprintConfig) -> FingerprintConfig {
        config.created_at = None;
        config.updated_at = None;
        config
    }

    #[test]
    fn test_default_is_valid() {
        assert!(FingerprintConfig::default().validate().is_ok());
        assert!(FingerprintConfig::new("work").is_valid());
    }

    #[test]
    fn test_validation_reports_every_issue() {
        let mut config = FingerprintConfig::default();
        config.profile_name.clear();
        config.navigator.user_agent.clear();
        config.screen.width = 0;
        config.canvas.noise_level = 1.5;
        config.webgl.buffer_noise_level = -0.1;
        config.audio.noise_level = 2.0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 6);
        assert!(err.contains(&ValidationIssue::EmptyProfileName));
        assert!(err.contains(&ValidationIssue::EmptyUserAgent));
        assert!(err.contains(&ValidationIssue::CanvasNoiseLevel(1.5)));
        assert!(err.to_string().contains("Audio noise level"));
    }

    #[test]
    fn test_disabled_surfaces_skip_their_invariants() {
        let mut config = FingerprintConfig::default();
        config.navigator.enabled = false;
        config.navigator.user_agent.clear();
        config.screen.enabled = false;
        config.screen.height = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nan_noise_level_rejected() {
        let mut config = FingerprintConfig::default();
        config.canvas.noise_level = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_self_merge_is_idempotent() {
        let mut config = FingerprintConfig::new("work").with_custom_script("console.log(1)");
        let before = config.clone();
        let copy = config.clone();

        config.merge(&copy).unwrap();

        assert_eq!(config.custom_scripts.len(), 1);
        assert_eq!(config.hash(), before.hash());
        assert_eq!(without_timestamps(config.clone()), without_timestamps(before.clone()));
        assert!(config.updated_at >= before.updated_at);
    }

    #[test]
    fn test_merge_replaces_enabled_subconfigs_wholesale() {
        let mut base = FingerprintConfig::default();
        base.canvas.spoof_text_metrics = false;

        let mut overlay = FingerprintConfig::default();
        overlay.canvas.noise_level = 0.5;
        overlay.webgl.enabled = false;
        overlay.webgl.vendor = "ignored".to_string();

        base.merge(&overlay).unwrap();
        assert_eq!(base.canvas.noise_level, 0.5);
        assert!(base.canvas.spoof_text_metrics);
        assert_eq!(base.webgl.vendor, WebGlConfig::default().vendor);
    }

    #[test]
    fn test_merge_names_and_scripts() {
        let mut base = FingerprintConfig::default().with_custom_script("a");
        let mut overlay = FingerprintConfig::default().with_custom_script("a");
        overlay.profile_name.clear();
        overlay.device_profile = "desktop_chrome".to_string();

        base.merge(&overlay).unwrap();
        assert_eq!(base.profile_name, "default");
        assert_eq!(base.device_profile, "desktop_chrome");
        assert_eq!(base.custom_scripts, vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_invalid_merge_leaves_target_untouched() {
        let mut base = FingerprintConfig::default();
        let before = base.clone();
        let mut overlay = FingerprintConfig::default();
        overlay.canvas.noise_level = 3.0;

        let err = base.merge(&overlay).unwrap_err();
        assert!(err.contains(&ValidationIssue::CanvasNoiseLevel(3.0)));
        assert_eq!(base, before);
    }

    #[test]
    fn test_hash_stability() {
        let a = FingerprintConfig::new("same");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = FingerprintConfig::new("same");
        assert_eq!(a.hash(), b.hash());

        let mut c = b.clone();
        c.timezone.timezone_offset = 60;
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash().to_hex().len(), 64);
    }

    #[test]
    fn test_json_aliases_and_defaults() {
        let config = FingerprintConfig::from_json(
            r#"{
                "profile_name": "alias",
                "custom_js_injections": ["x"],
                "anti_detection": { "automation": { "min_delay_ms": 250 } },
                "unknown": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.profile_name, "alias");
        assert_eq!(config.custom_scripts, vec!["x".to_string()]);
        assert_eq!(config.anti_detection.automation.min_delay_ms, 250);
        assert_eq!(config.anti_detection.automation.max_delay_ms, 2000);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fingerprint.json");
        let config = FingerprintConfig::new("saved");
        config.to_file(&path).unwrap();

        let loaded = FingerprintConfig::from_file(&path).unwrap();
        assert_eq!(loaded.hash(), config.hash());
        assert!(matches!(
            FingerprintConfig::from_file(dir.path().join("fingerprint.yaml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
