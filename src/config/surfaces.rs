//! Per-surface spoofing settings.
//!
//! Every record here is one branch of the [`FingerprintConfig`] tree. Each
//! carries its own `enabled` flag; merge replaces a whole record when the
//! incoming record is enabled, so fields are never merged one by one.
//!
//! All records deserialize with `#[serde(default)]`: missing fields take the
//! defaults below and unknown fields are ignored.
//!
//! [`FingerprintConfig`]: super::FingerprintConfig

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Chrome 120 on Windows 10, the default spoofed user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Canvas 2D pixel and text spoofing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Whether canvas spoofing is active.
    pub enabled: bool,
    /// Add coherent noise to read-back pixels.
    pub add_noise: bool,
    /// Noise intensity in `[0.0, 1.0]`.
    pub noise_level: f64,
    /// Perturb `measureText` results.
    pub spoof_text_metrics: bool,
    /// Perturb pixels behind `toDataURL` exports.
    pub protect_data_url: bool,
    /// Perturb pixels returned by `getImageData`.
    pub protect_image_data: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            add_noise: true,
            noise_level: 0.1,
            spoof_text_metrics: true,
            protect_data_url: true,
            protect_image_data: true,
        }
    }
}

impl CanvasConfig {
    /// Set the noise level.
    pub fn with_noise_level(mut self, level: f64) -> Self {
        self.noise_level = level;
        self
    }

    /// Whether pixel noise should be applied at all.
    pub fn noise_active(&self) -> bool {
        self.enabled && self.add_noise && self.noise_level > 0.0
    }
}

/// WebGL identity strings, parameter overrides and buffer noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebGlConfig {
    pub enabled: bool,
    /// `VENDOR` / `UNMASKED_VENDOR_WEBGL`.
    pub vendor: String,
    /// `RENDERER` / `UNMASKED_RENDERER_WEBGL`.
    pub renderer: String,
    pub version: String,
    pub shading_language_version: String,
    /// Extensions appended to the supported list.
    pub extensions: Vec<String>,
    /// Named parameter overrides; values parse as integers when they can.
    pub parameters: BTreeMap<String, String>,
    pub add_buffer_noise: bool,
    /// Buffer noise intensity in `[0.0, 1.0]`.
    pub buffer_noise_level: f64,
}

impl Default for WebGlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vendor: "Google Inc. (Intel)".to_string(),
            renderer: "ANGLE (Intel, Intel(R) UHD Graphics 620 Direct3D11 vs_5_0 ps_5_0, D3D11)"
                .to_string(),
            version: "OpenGL ES 2.0 (ANGLE 2.1.0.0)".to_string(),
            shading_language_version: "OpenGL ES GLSL ES 1.00 (ANGLE 2.1.0.0)".to_string(),
            extensions: Vec::new(),
            parameters: BTreeMap::new(),
            add_buffer_noise: true,
            buffer_noise_level: 0.01,
        }
    }
}

impl WebGlConfig {
    /// Set vendor and renderer in one go.
    pub fn with_gpu(mut self, vendor: impl Into<String>, renderer: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self.renderer = renderer.into();
        self
    }

    /// Whether buffer noise should be applied at all.
    pub fn buffer_noise_active(&self) -> bool {
        self.enabled && self.add_buffer_noise && self.buffer_noise_level > 0.0
    }
}

/// `navigator.*` properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub enabled: bool,
    /// Must be non-empty while `enabled` is set.
    pub user_agent: String,
    pub platform: String,
    pub languages: Vec<String>,
    pub hardware_concurrency: u32,
    /// Reported memory in GiB.
    pub device_memory: u32,
    pub hide_webdriver: bool,
    pub spoof_plugins: bool,
    pub mime_types: Vec<String>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            platform: "Win32".to_string(),
            languages: vec!["en-US".to_string(), "en".to_string()],
            hardware_concurrency: 8,
            device_memory: 8,
            hide_webdriver: true,
            spoof_plugins: true,
            mime_types: Vec::new(),
        }
    }
}

/// AudioContext perturbation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub add_noise: bool,
    /// Noise intensity in `[0.0, 1.0]`.
    pub noise_level: f64,
    pub protect_analyser_node: bool,
    pub protect_offline_context: bool,
    pub sample_rate: u32,
    pub buffer_size: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            add_noise: true,
            noise_level: 0.001,
            protect_analyser_node: true,
            protect_offline_context: true,
            sample_rate: 44_100,
            buffer_size: 4096,
        }
    }
}

/// Font enumeration and metric spoofing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub enabled: bool,
    pub spoof_enumeration: bool,
    pub spoof_metrics: bool,
    /// Fonts reported as installed.
    pub available_fonts: Vec<String>,
    /// Per-font width offsets added to measured text.
    pub font_metrics_offsets: BTreeMap<String, f64>,
}

impl Default for FontConfig {
    fn default() -> Self {
        let fonts = [
            "Arial",
            "Arial Black",
            "Calibri",
            "Cambria",
            "Comic Sans MS",
            "Consolas",
            "Courier New",
            "Georgia",
            "Impact",
            "Lucida Console",
            "Lucida Sans Unicode",
            "Microsoft Sans Serif",
            "Palatino Linotype",
            "Segoe UI",
            "Tahoma",
            "Times New Roman",
            "Trebuchet MS",
            "Verdana",
        ];
        Self {
            enabled: true,
            spoof_enumeration: true,
            spoof_metrics: true,
            available_fonts: fonts.iter().map(|f| f.to_string()).collect(),
            font_metrics_offsets: BTreeMap::new(),
        }
    }
}

/// WebRTC address masking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebRtcConfig {
    pub enabled: bool,
    pub mask_local_ips: bool,
    pub disable_webrtc: bool,
    /// Address reported in place of the real public IP.
    pub fake_public_ip: String,
    pub allowed_ice_servers: Vec<String>,
    pub block_device_enumeration: bool,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mask_local_ips: true,
            disable_webrtc: false,
            fake_public_ip: "203.0.113.1".to_string(),
            allowed_ice_servers: Vec::new(),
            block_device_enumeration: true,
        }
    }
}

/// Geolocation API spoofing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub enabled: bool,
    pub spoof_location: bool,
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy in metres.
    pub accuracy: f64,
    pub block_high_accuracy: bool,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spoof_location: true,
            latitude: 40.7128,
            longitude: -74.0060,
            accuracy: 10.0,
            block_high_accuracy: true,
        }
    }
}

/// `screen.*` and `devicePixelRatio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub enabled: bool,
    /// Must be positive while `enabled` is set.
    pub width: u32,
    /// Must be positive while `enabled` is set.
    pub height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
    pub device_pixel_ratio: f64,
    pub orientation: String,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 1920,
            height: 1080,
            color_depth: 24,
            pixel_depth: 24,
            device_pixel_ratio: 1.0,
            orientation: "landscape-primary".to_string(),
        }
    }
}

impl ScreenConfig {
    /// Set the reported resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Timezone and `Date` spoofing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimezoneConfig {
    pub enabled: bool,
    /// IANA zone name, e.g. `Europe/Berlin`.
    pub timezone: String,
    /// UTC offset in minutes as reported by `getTimezoneOffset`.
    pub timezone_offset: i32,
    pub spoof_date_methods: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: "America/New_York".to_string(),
            timezone_offset: -300,
            spoof_date_methods: true,
        }
    }
}

/// Hiding of `navigator.webdriver` and driver-injected globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverProtection {
    pub hide_webdriver_property: bool,
    pub hide_automation_flags: bool,
    pub spoof_chrome_runtime: bool,
    pub hide_selenium_variables: bool,
    /// Global property names removed from the page.
    pub blocked_properties: Vec<String>,
}

impl Default for WebDriverProtection {
    fn default() -> Self {
        let blocked = [
            "webdriver",
            "__webdriver_evaluate",
            "__selenium_evaluate",
            "__webdriver_script_function",
            "__webdriver_script_func",
            "__webdriver_script_fn",
            "__fxdriver_evaluate",
            "__driver_unwrapped",
            "__webdriver_unwrapped",
            "__driver_evaluate",
            "__selenium_unwrapped",
            "__fxdriver_unwrapped",
        ];
        Self {
            hide_webdriver_property: true,
            hide_automation_flags: true,
            spoof_chrome_runtime: true,
            hide_selenium_variables: true,
            blocked_properties: blocked.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Human-like pacing of automated actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationProtection {
    pub hide_headless_flags: bool,
    pub spoof_user_interaction: bool,
    pub add_human_delays: bool,
    pub randomize_request_timing: bool,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for AutomationProtection {
    fn default() -> Self {
        Self {
            hide_headless_flags: true,
            spoof_user_interaction: true,
            add_human_delays: true,
            randomize_request_timing: true,
            min_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl AutomationProtection {
    /// Sample a delay between the configured bounds.
    ///
    /// Returns zero when human delays are off. Inverted bounds are swapped.
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if !self.add_human_delays {
            return Duration::ZERO;
        }
        let (lo, hi) = if self.min_delay_ms <= self.max_delay_ms {
            (self.min_delay_ms, self.max_delay_ms)
        } else {
            (self.max_delay_ms, self.min_delay_ms)
        };
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

/// Blocking of scripts that probe for automation frameworks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsInjectionProtection {
    pub detect_puppeteer: bool,
    pub detect_playwright: bool,
    pub detect_selenium: bool,
    pub block_detection_scripts: bool,
    /// Case-insensitive substrings that mark a script as a detector.
    pub blocked_script_patterns: Vec<String>,
}

impl Default for JsInjectionProtection {
    fn default() -> Self {
        let patterns = [
            "puppeteer",
            "playwright",
            "selenium",
            "webdriver",
            "automation",
            "headless",
            "__nightmare",
            "_phantom",
            "callPhantom",
        ];
        Self {
            detect_puppeteer: true,
            detect_playwright: true,
            detect_selenium: true,
            block_detection_scripts: true,
            blocked_script_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl JsInjectionProtection {
    /// Whether `script` (a URL or source snippet) matches a blocked pattern.
    pub fn is_blocked(&self, script: &str) -> bool {
        if !self.block_detection_scripts || script.is_empty() {
            return false;
        }
        let haystack = script.to_lowercase();
        self.blocked_script_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| haystack.contains(&p.to_lowercase()))
    }
}

/// Automation-detection countermeasures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiDetectionConfig {
    pub enabled: bool,
    pub webdriver: WebDriverProtection,
    pub automation: AutomationProtection,
    pub js_injection: JsInjectionProtection,
}

impl Default for AntiDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webdriver: WebDriverProtection::default(),
            automation: AutomationProtection::default(),
            js_injection: JsInjectionProtection::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_partial_json_fills_defaults() {
        let canvas: CanvasConfig = serde_json::from_str(r#"{"noise_level": 0.3}"#).unwrap();
        assert!(canvas.enabled);
        assert!(canvas.protect_data_url);
        assert_eq!(canvas.noise_level, 0.3);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let screen: ScreenConfig =
            serde_json::from_str(r#"{"width": 1280, "refresh_rate": 144}"#).unwrap();
        assert_eq!(screen.width, 1280);
        assert_eq!(screen.height, 1080);
    }

    #[test]
    fn test_default_fonts() {
        let fonts = FontConfig::default();
        assert_eq!(fonts.available_fonts.len(), 18);
        assert!(fonts.available_fonts.iter().any(|f| f == "Segoe UI"));
    }

    #[test]
    fn test_sample_delay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let automation = AutomationProtection::default();
        for _ in 0..200 {
            let delay = automation.sample_delay(&mut rng);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_sample_delay_inverted_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let automation = AutomationProtection {
            min_delay_ms: 500,
            max_delay_ms: 200,
            ..Default::default()
        };
        let delay = automation.sample_delay(&mut rng);
        assert!(delay >= Duration::from_millis(200) && delay <= Duration::from_millis(500));
    }

    #[test]
    fn test_sample_delay_disabled() {
        let mut rng = StdRng::seed_from_u64(1);
        let automation = AutomationProtection {
            add_human_delays: false,
            ..Default::default()
        };
        assert_eq!(automation.sample_delay(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_blocked_scripts() {
        let js = JsInjectionProtection::default();
        assert!(js.is_blocked("https://cdn.example.com/Puppeteer-detect.js"));
        assert!(js.is_blocked("if (window.callPhantom) {}"));
        assert!(!js.is_blocked("https://cdn.example.com/app.js"));

        let off = JsInjectionProtection {
            block_detection_scripts: false,
            ..Default::default()
        };
        assert!(!off.is_blocked("puppeteer"));
    }

    #[test]
    fn test_noise_active_flags() {
        assert!(CanvasConfig::default().noise_active());
        assert!(!CanvasConfig::default().with_noise_level(0.0).noise_active());
        let webgl = WebGlConfig {
            add_buffer_noise: false,
            ..Default::default()
        };
        assert!(!webgl.buffer_noise_active());
    }
}
