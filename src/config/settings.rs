//! Host settings for the shield.
//!
//! These are the knobs a host process sets once at startup: which files hold
//! the default fingerprint config and the catalogs, the session key that
//! seeds all noise, and whether protection starts enabled. They are separate
//! from [`FingerprintConfig`](super::FingerprintConfig), which describes what
//! to spoof.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::fingerprint::{extension_of, ValidationError};

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration.
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Failed to parse JSON configuration.
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A fingerprint config broke one or more invariants.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Invalid settings value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Startup settings for the shield.
///
/// # Example
///
/// ```rust
/// use fingerprint_shield::config::ShieldSettings;
///
/// let settings = ShieldSettings::default()
///     .with_enabled(true)
///     .with_session_key("profile-42");
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldSettings {
    /// Initial state of the global protection toggle.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Default fingerprint config file (JSON or TOML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,

    /// Device profile catalog (JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_profiles_path: Option<PathBuf>,

    /// Behavior pattern catalog (JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_patterns_path: Option<PathBuf>,

    /// Seeds all noise. A fixed key reproduces noise across restarts; without
    /// one a random key is drawn per process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ShieldSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            config_path: None,
            device_profiles_path: None,
            behavior_patterns_path: None,
            session_key: None,
        }
    }
}

impl ShieldSettings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match extension_of(path).as_str() {
            "toml" => Ok(toml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            ext => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Saves settings; the format follows the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match extension_of(path).as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Defaults with `FP_SHIELD_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Applies environment variable overrides:
    /// - `FP_SHIELD_ENABLED`
    /// - `FP_SHIELD_CONFIG`
    /// - `FP_SHIELD_DEVICE_PROFILES`
    /// - `FP_SHIELD_BEHAVIOR_PATTERNS`
    /// - `FP_SHIELD_SESSION_KEY`
    pub fn merge_with_env(mut self) -> Self {
        if let Ok(val) = env::var("FP_SHIELD_ENABLED") {
            self.enabled = parse_bool(&val);
        }
        if let Ok(val) = env::var("FP_SHIELD_CONFIG") {
            self.config_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("FP_SHIELD_DEVICE_PROFILES") {
            self.device_profiles_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("FP_SHIELD_BEHAVIOR_PATTERNS") {
            self.behavior_patterns_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("FP_SHIELD_SESSION_KEY") {
            self.session_key = Some(val);
        }
        self
    }

    /// Applies CLI overrides. Only fields set in `args` change.
    pub fn merge_with_args(mut self, args: &CliArgs) -> Self {
        if let Some(enabled) = args.enabled {
            self.enabled = enabled;
        }
        if let Some(ref path) = args.config_path {
            self.config_path = Some(path.clone());
        }
        if let Some(ref path) = args.device_profiles_path {
            self.device_profiles_path = Some(path.clone());
        }
        if let Some(ref path) = args.behavior_patterns_path {
            self.behavior_patterns_path = Some(path.clone());
        }
        if let Some(ref key) = args.session_key {
            self.session_key = Some(key.clone());
        }
        self
    }

    /// Validates all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref key) = self.session_key {
            if key.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Session key cannot be empty when set".to_string(),
                ));
            }
        }

        let files = [
            ("Fingerprint config", &self.config_path),
            ("Device profile catalog", &self.device_profiles_path),
            ("Behavior pattern catalog", &self.behavior_patterns_path),
        ];
        for (label, path) in files {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(ConfigError::ValidationError(format!(
                        "{} file does not exist: {}",
                        label,
                        path.display()
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_device_profiles(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_profiles_path = Some(path.into());
        self
    }

    pub fn with_behavior_patterns(mut self, path: impl Into<PathBuf>) -> Self {
        self.behavior_patterns_path = Some(path.into());
        self
    }

    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// CLI argument structure; all fields optional so they only override.
#[derive(Debug, Default, Clone)]
pub struct CliArgs {
    /// Settings file path.
    pub settings_file: Option<PathBuf>,
    /// Override the initial global toggle.
    pub enabled: Option<bool>,
    /// Default fingerprint config file.
    pub config_path: Option<PathBuf>,
    /// Device profile catalog file.
    pub device_profiles_path: Option<PathBuf>,
    /// Behavior pattern catalog file.
    pub behavior_patterns_path: Option<PathBuf>,
    /// Session key.
    pub session_key: Option<String>,
}

impl CliArgs {
    /// Creates an empty CliArgs instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves settings with precedence: defaults, settings file,
    /// environment, then these arguments. The result is validated.
    pub fn load_settings(&self) -> Result<ShieldSettings, ConfigError> {
        let settings = if let Some(ref file) = self.settings_file {
            ShieldSettings::from_file(file)?
        } else {
            ShieldSettings::default()
        };

        let settings = settings.merge_with_env().merge_with_args(self);
        settings.validate()?;

        Ok(settings)
    }
}
