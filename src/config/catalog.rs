//! Named device profiles and behavior patterns.
//!
//! Catalog files are JSON objects with one section keyed by name:
//!
//! ```json
//! { "profiles": { "desktop_chrome": { "screen": { "width": 2560 } } } }
//! { "patterns": { "careful_user": { "keyboard": { "typing_speed_wpm": 35 } } } }
//! ```
//!
//! Entries that are not objects, or that do not deserialize, are skipped with
//! a warning. A root that is not an object, or a missing section, fails the
//! whole load.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use super::fingerprint::FingerprintConfig;
use super::surfaces::{
    AudioConfig, CanvasConfig, FontConfig, NavigatorConfig, ScreenConfig, WebGlConfig,
};

/// Errors raised while parsing a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog root must be a JSON object")]
    NotAnObject,

    #[error("Catalog is missing the '{0}' section")]
    MissingSection(&'static str),
}

/// A named bundle of device-identifying surfaces.
///
/// Sections left out of the catalog entry stay `None` and leave the target
/// config's section alone when the profile is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigator: Option<NavigatorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webgl: Option<WebGlConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontConfig>,
    /// Free-form values a host may attach to the profile.
    pub custom_properties: BTreeMap<String, String>,
}

impl DeviceProfile {
    /// Overlay the sections this profile defines onto `base`.
    pub fn apply_to(&self, base: &FingerprintConfig) -> FingerprintConfig {
        let mut config = base.clone();
        if let Some(navigator) = &self.navigator {
            config.navigator = navigator.clone();
        }
        if let Some(screen) = &self.screen {
            config.screen = screen.clone();
        }
        if let Some(canvas) = &self.canvas {
            config.canvas = canvas.clone();
        }
        if let Some(webgl) = &self.webgl {
            config.webgl = webgl.clone();
        }
        if let Some(audio) = &self.audio {
            config.audio = audio.clone();
        }
        if let Some(font) = &self.font {
            config.font = font.clone();
        }
        if !self.name.is_empty() {
            config.device_profile = self.name.clone();
        }
        config.touch();
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseBehavior {
    /// Multiplier on baseline cursor speed.
    pub movement_speed: f64,
    pub click_delay_ms: u64,
    pub add_random_movements: bool,
    pub random_movement_probability: f64,
}

impl Default for MouseBehavior {
    fn default() -> Self {
        Self {
            movement_speed: 1.0,
            click_delay_ms: 100,
            add_random_movements: true,
            random_movement_probability: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardBehavior {
    pub typing_speed_wpm: u32,
    pub key_press_delay_ms: u64,
    pub add_typing_errors: bool,
    pub error_probability: f64,
}

impl Default for KeyboardBehavior {
    fn default() -> Self {
        Self {
            typing_speed_wpm: 60,
            key_press_delay_ms: 50,
            add_typing_errors: true,
            error_probability: 0.02,
        }
    }
}

impl KeyboardBehavior {
    /// Average time between keystrokes at the configured speed.
    ///
    /// Uses the usual five characters per word. Never shorter than the key
    /// press delay.
    pub fn keystroke_interval(&self) -> Duration {
        let press = Duration::from_millis(self.key_press_delay_ms);
        if self.typing_speed_wpm == 0 {
            return press;
        }
        let per_char_ms = 60_000 / (u64::from(self.typing_speed_wpm) * 5);
        press.max(Duration::from_millis(per_char_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollBehavior {
    pub scroll_speed: f64,
    pub smooth_scrolling: bool,
    pub pause_probability: f64,
    pub pause_duration_ms: u64,
}

impl Default for ScrollBehavior {
    fn default() -> Self {
        Self {
            scroll_speed: 1.0,
            smooth_scrolling: true,
            pause_probability: 0.3,
            pause_duration_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionBehavior {
    pub page_dwell_time_ms: u64,
    pub simulate_reading: bool,
    pub link_click_probability: f64,
    pub form_fill_speed: f64,
}

impl Default for InteractionBehavior {
    fn default() -> Self {
        Self {
            page_dwell_time_ms: 5000,
            simulate_reading: true,
            link_click_probability: 0.8,
            form_fill_speed: 1.0,
        }
    }
}

/// Simulated human interaction timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorPattern {
    pub name: String,
    pub description: String,
    pub mouse: MouseBehavior,
    pub keyboard: KeyboardBehavior,
    pub scroll: ScrollBehavior,
    pub interaction: InteractionBehavior,
}

/// Catalog records carry their own name, which the catalog key overrides.
pub trait CatalogEntry: DeserializeOwned {
    /// Top-level section holding the entries.
    const SECTION: &'static str;

    fn set_name(&mut self, name: &str);
}

impl CatalogEntry for DeviceProfile {
    const SECTION: &'static str = "profiles";

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl CatalogEntry for BehaviorPattern {
    const SECTION: &'static str = "patterns";

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

/// Parse a catalog document into `name -> entry`.
pub fn parse_catalog<T: CatalogEntry>(json: &str) -> Result<BTreeMap<String, T>, CatalogError> {
    let root: Value = serde_json::from_str(json)?;
    let root = root.as_object().ok_or(CatalogError::NotAnObject)?;
    let section = root
        .get(T::SECTION)
        .and_then(Value::as_object)
        .ok_or(CatalogError::MissingSection(T::SECTION))?;

    let mut entries = BTreeMap::new();
    for (name, value) in section {
        if !value.is_object() {
            warn!("Skipping catalog entry '{}' in '{}': not an object", name, T::SECTION);
            continue;
        }
        match serde_json::from_value::<T>(value.clone()) {
            Ok(mut entry) => {
                entry.set_name(name);
                entries.insert(name.clone(), entry);
            }
            Err(e) => {
                warn!("Skipping catalog entry '{}' in '{}': {}", name, T::SECTION, e);
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profiles() {
        let json = r#"{
            "profiles": {
                "laptop": {
                    "description": "13 inch laptop",
                    "screen": { "width": 1440, "height": 900 },
                    "custom_properties": { "battery": "true" }
                },
                "broken": 42,
                "wrong_types": { "screen": { "width": "wide" } }
            }
        }"#;
        let profiles: BTreeMap<String, DeviceProfile> = parse_catalog(json).unwrap();
        assert_eq!(profiles.len(), 1);

        let laptop = &profiles["laptop"];
        assert_eq!(laptop.name, "laptop");
        let screen = laptop.screen.as_ref().unwrap();
        assert_eq!(screen.width, 1440);
        assert_eq!(screen.color_depth, 24);
        assert!(laptop.navigator.is_none());
        assert_eq!(laptop.custom_properties["battery"], "true");
    }

    #[test]
    fn test_parse_patterns_defaults() {
        let json = r#"{ "patterns": { "slow": { "keyboard": { "typing_speed_wpm": 30 } } } }"#;
        let patterns: BTreeMap<String, BehaviorPattern> = parse_catalog(json).unwrap();
        let slow = &patterns["slow"];
        assert_eq!(slow.keyboard.typing_speed_wpm, 30);
        assert_eq!(slow.keyboard.key_press_delay_ms, 50);
        assert_eq!(slow.scroll.pause_duration_ms, 500);
        assert_eq!(slow.interaction.link_click_probability, 0.8);
    }

    #[test]
    fn test_malformed_catalogs() {
        assert!(matches!(
            parse_catalog::<DeviceProfile>("[1, 2]"),
            Err(CatalogError::NotAnObject)
        ));
        assert!(matches!(
            parse_catalog::<DeviceProfile>(r#"{"patterns": {}}"#),
            Err(CatalogError::MissingSection("profiles"))
        ));
        assert!(matches!(
            parse_catalog::<BehaviorPattern>("{not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_keystroke_interval() {
        let keyboard = KeyboardBehavior::default();
        // 60 wpm = 300 chars/min = 200 ms per char
        assert_eq!(keyboard.keystroke_interval(), Duration::from_millis(200));

        let fast = KeyboardBehavior {
            typing_speed_wpm: 2000,
            ..Default::default()
        };
        assert_eq!(fast.keystroke_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_apply_profile() {
        let profile = DeviceProfile {
            name: "mac".to_string(),
            screen: Some(ScreenConfig::default().with_resolution(2560, 1600)),
            ..Default::default()
        };
        let config = profile.apply_to(&FingerprintConfig::default());
        assert_eq!(config.device_profile, "mac");
        assert_eq!(config.screen.width, 2560);
        assert!(config.created_at.is_some());
    }

    #[test]
    fn test_apply_profile_keeps_undefined_sections() {
        let json = r#"{ "profiles": { "gpu_only": { "webgl": { "vendor": "NVIDIA Corporation" } } } }"#;
        let profiles: BTreeMap<String, DeviceProfile> = parse_catalog(json).unwrap();

        let mut base = FingerprintConfig::new("custom");
        base.navigator.platform = "MacIntel".to_string();
        base.screen.width = 3024;

        let config = profiles["gpu_only"].apply_to(&base);
        assert_eq!(config.webgl.vendor, "NVIDIA Corporation");
        assert_eq!(config.navigator.platform, "MacIntel");
        assert_eq!(config.screen.width, 3024);
    }
}
