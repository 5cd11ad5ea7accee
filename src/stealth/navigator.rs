//! Per-context spoofed values.
//!
//! [`SurfaceOverrides`] is computed once from a [`FingerprintConfig`] when the
//! registry installs it, and never changes afterwards. Reading a value never
//! mutates state. A surface that is disabled, or a config whose master switch
//! is off, yields `None` (or an empty list) and the host reports the real
//! value.
//!
//! `navigator.webdriver` is special: whenever hiding is on, the reported value
//! is always `false`.
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::config::FingerprintConfig;
//! use fingerprint_shield::stealth::navigator::SurfaceOverrides;
//!
//! let overrides = SurfaceOverrides::from_config(&FingerprintConfig::default());
//! assert_eq!(overrides.webdriver(), Some(false));
//! assert_eq!(overrides.platform(), Some("Win32"));
//! ```

use crate::config::FingerprintConfig;
use crate::stealth::webgl::supported_extensions;

/// Spoofed `navigator` values.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorValues {
    pub user_agent: String,
    pub platform: String,
    pub languages: Vec<String>,
    pub hardware_concurrency: u32,
    pub device_memory: u32,
}

/// Spoofed `screen` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenValues {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
    pub device_pixel_ratio: f64,
    pub orientation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimezoneValues {
    pub name: String,
    /// Minutes, as `Date.prototype.getTimezoneOffset` reports them.
    pub offset_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// WebGL identity strings and the filtered extension list.
#[derive(Debug, Clone, PartialEq)]
pub struct WebGlIdentity {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub shading_language_version: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioValues {
    /// Zero when audio noise is off.
    pub noise_level: f64,
    pub sample_rate: u32,
    pub buffer_size: u32,
}

/// Cached spoofed values for one context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceOverrides {
    navigator: Option<NavigatorValues>,
    hide_webdriver: bool,
    screen: Option<ScreenValues>,
    timezone: Option<TimezoneValues>,
    geolocation: Option<GeoPosition>,
    webgl: Option<WebGlIdentity>,
    fonts: Option<Vec<String>>,
    webrtc_public_ip: Option<String>,
    block_local_ips: bool,
    audio: Option<AudioValues>,
    blocked_properties: Vec<String>,
    blocked_script_patterns: Vec<String>,
}

impl SurfaceOverrides {
    /// Overrides that spoof nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FingerprintConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let nav = &config.navigator;
        let navigator = nav.enabled.then(|| NavigatorValues {
            user_agent: nav.user_agent.clone(),
            platform: nav.platform.clone(),
            languages: nav.languages.clone(),
            hardware_concurrency: nav.hardware_concurrency,
            device_memory: nav.device_memory,
        });

        let anti = &config.anti_detection;
        let hide_webdriver = (nav.enabled && nav.hide_webdriver)
            || (anti.enabled && anti.webdriver.hide_webdriver_property);

        let scr = &config.screen;
        let screen = scr.enabled.then(|| ScreenValues {
            width: scr.width,
            height: scr.height,
            color_depth: scr.color_depth,
            pixel_depth: scr.pixel_depth,
            device_pixel_ratio: scr.device_pixel_ratio,
            orientation: scr.orientation.clone(),
        });

        let tz = &config.timezone;
        let timezone = tz.enabled.then(|| TimezoneValues {
            name: tz.timezone.clone(),
            offset_minutes: tz.timezone_offset,
        });

        let geo = &config.geolocation;
        let geolocation = (geo.enabled && geo.spoof_location).then_some(GeoPosition {
            latitude: geo.latitude,
            longitude: geo.longitude,
            accuracy: geo.accuracy,
        });

        let gl = &config.webgl;
        let webgl = gl.enabled.then(|| WebGlIdentity {
            vendor: gl.vendor.clone(),
            renderer: gl.renderer.clone(),
            version: gl.version.clone(),
            shading_language_version: gl.shading_language_version.clone(),
            extensions: supported_extensions(gl),
        });

        let font = &config.font;
        let fonts = (font.enabled && font.spoof_enumeration).then(|| font.available_fonts.clone());

        let rtc = &config.webrtc;
        let webrtc_public_ip = (rtc.enabled && !rtc.fake_public_ip.is_empty())
            .then(|| rtc.fake_public_ip.clone());
        let block_local_ips = rtc.enabled && (rtc.mask_local_ips || rtc.disable_webrtc);

        let aud = &config.audio;
        let audio = aud.enabled.then_some(AudioValues {
            noise_level: if aud.add_noise { aud.noise_level } else { 0.0 },
            sample_rate: aud.sample_rate,
            buffer_size: aud.buffer_size,
        });

        let (blocked_properties, blocked_script_patterns) = if anti.enabled {
            let properties = if anti.webdriver.hide_selenium_variables {
                anti.webdriver.blocked_properties.clone()
            } else {
                Vec::new()
            };
            let patterns = if anti.js_injection.block_detection_scripts {
                anti.js_injection.blocked_script_patterns.clone()
            } else {
                Vec::new()
            };
            (properties, patterns)
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            navigator,
            hide_webdriver,
            screen,
            timezone,
            geolocation,
            webgl,
            fonts,
            webrtc_public_ip,
            block_local_ips,
            audio,
            blocked_properties,
            blocked_script_patterns,
        }
    }

    pub fn navigator(&self) -> Option<&NavigatorValues> {
        self.navigator.as_ref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.navigator.as_ref().map(|n| n.user_agent.as_str())
    }

    pub fn platform(&self) -> Option<&str> {
        self.navigator.as_ref().map(|n| n.platform.as_str())
    }

    pub fn languages(&self) -> &[String] {
        self.navigator
            .as_ref()
            .map(|n| n.languages.as_slice())
            .unwrap_or(&[])
    }

    pub fn hardware_concurrency(&self) -> Option<u32> {
        self.navigator.as_ref().map(|n| n.hardware_concurrency)
    }

    pub fn device_memory(&self) -> Option<u32> {
        self.navigator.as_ref().map(|n| n.device_memory)
    }

    /// Value to report for `navigator.webdriver`; `Some(false)` whenever
    /// hiding is on.
    pub fn webdriver(&self) -> Option<bool> {
        self.hide_webdriver.then_some(false)
    }

    pub fn screen(&self) -> Option<&ScreenValues> {
        self.screen.as_ref()
    }

    pub fn timezone(&self) -> Option<&TimezoneValues> {
        self.timezone.as_ref()
    }

    pub fn geolocation(&self) -> Option<GeoPosition> {
        self.geolocation
    }

    pub fn webgl(&self) -> Option<&WebGlIdentity> {
        self.webgl.as_ref()
    }

    pub fn fonts(&self) -> Option<&[String]> {
        self.fonts.as_deref()
    }

    pub fn webrtc_public_ip(&self) -> Option<&str> {
        self.webrtc_public_ip.as_deref()
    }

    /// Hide local candidate addresses from ICE gathering.
    pub fn blocks_local_ips(&self) -> bool {
        self.block_local_ips
    }

    pub fn audio(&self) -> Option<AudioValues> {
        self.audio
    }

    /// Driver globals to delete from the page.
    pub fn blocked_properties(&self) -> &[String] {
        &self.blocked_properties
    }

    pub fn blocked_script_patterns(&self) -> &[String] {
        &self.blocked_script_patterns
    }
}
