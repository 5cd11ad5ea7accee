//! Aggregate protection counters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One named counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    TotalFramesProtected,
    CanvasOperationsSpoofed,
    WebglParametersSpoofed,
    NavigatorPropertiesSpoofed,
    WebdriverDetectionsBlocked,
    AudioContextsProtected,
    FontEnumerationsSpoofed,
    GeolocationRequestsSpoofed,
    WebrtcConnectionsProtected,
    FingerprintingAttemptsDetected,
}

impl Stat {
    pub const ALL: [Stat; 10] = [
        Stat::TotalFramesProtected,
        Stat::CanvasOperationsSpoofed,
        Stat::WebglParametersSpoofed,
        Stat::NavigatorPropertiesSpoofed,
        Stat::WebdriverDetectionsBlocked,
        Stat::AudioContextsProtected,
        Stat::FontEnumerationsSpoofed,
        Stat::GeolocationRequestsSpoofed,
        Stat::WebrtcConnectionsProtected,
        Stat::FingerprintingAttemptsDetected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stat::TotalFramesProtected => "total_frames_protected",
            Stat::CanvasOperationsSpoofed => "canvas_operations_spoofed",
            Stat::WebglParametersSpoofed => "webgl_parameters_spoofed",
            Stat::NavigatorPropertiesSpoofed => "navigator_properties_spoofed",
            Stat::WebdriverDetectionsBlocked => "webdriver_detections_blocked",
            Stat::AudioContextsProtected => "audio_contexts_protected",
            Stat::FontEnumerationsSpoofed => "font_enumerations_spoofed",
            Stat::GeolocationRequestsSpoofed => "geolocation_requests_spoofed",
            Stat::WebrtcConnectionsProtected => "webrtc_connections_protected",
            Stat::FingerprintingAttemptsDetected => "fingerprinting_attempts_detected",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stat::ALL
            .into_iter()
            .find(|stat| stat.as_str() == s)
            .ok_or_else(|| format!("Unknown statistic: {}", s))
    }
}

/// Snapshot of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_frames_protected: u64,
    pub canvas_operations_spoofed: u64,
    pub webgl_parameters_spoofed: u64,
    pub navigator_properties_spoofed: u64,
    pub webdriver_detections_blocked: u64,
    pub audio_contexts_protected: u64,
    pub font_enumerations_spoofed: u64,
    pub geolocation_requests_spoofed: u64,
    pub webrtc_connections_protected: u64,
    pub fingerprinting_attempts_detected: u64,
}

impl Statistics {
    fn slot(&mut self, stat: Stat) -> &mut u64 {
        match stat {
            Stat::TotalFramesProtected => &mut self.total_frames_protected,
            Stat::CanvasOperationsSpoofed => &mut self.canvas_operations_spoofed,
            Stat::WebglParametersSpoofed => &mut self.webgl_parameters_spoofed,
            Stat::NavigatorPropertiesSpoofed => &mut self.navigator_properties_spoofed,
            Stat::WebdriverDetectionsBlocked => &mut self.webdriver_detections_blocked,
            Stat::AudioContextsProtected => &mut self.audio_contexts_protected,
            Stat::FontEnumerationsSpoofed => &mut self.font_enumerations_spoofed,
            Stat::GeolocationRequestsSpoofed => &mut self.geolocation_requests_spoofed,
            Stat::WebrtcConnectionsProtected => &mut self.webrtc_connections_protected,
            Stat::FingerprintingAttemptsDetected => &mut self.fingerprinting_attempts_detected,
        }
    }

    pub fn increment(&mut self, stat: Stat) {
        let slot = self.slot(stat);
        *slot = slot.saturating_add(1);
    }

    pub fn get(&self, stat: Stat) -> u64 {
        match stat {
            Stat::TotalFramesProtected => self.total_frames_protected,
            Stat::CanvasOperationsSpoofed => self.canvas_operations_spoofed,
            Stat::WebglParametersSpoofed => self.webgl_parameters_spoofed,
            Stat::NavigatorPropertiesSpoofed => self.navigator_properties_spoofed,
            Stat::WebdriverDetectionsBlocked => self.webdriver_detections_blocked,
            Stat::AudioContextsProtected => self.audio_contexts_protected,
            Stat::FontEnumerationsSpoofed => self.font_enumerations_spoofed,
            Stat::GeolocationRequestsSpoofed => self.geolocation_requests_spoofed,
            Stat::WebrtcConnectionsProtected => self.webrtc_connections_protected,
            Stat::FingerprintingAttemptsDetected => self.fingerprinting_attempts_detected,
        }
    }

    /// Flat `name -> count` view.
    pub fn to_map(&self) -> BTreeMap<&'static str, u64> {
        Stat::ALL
            .into_iter()
            .map(|stat| (stat.as_str(), self.get(stat)))
            .collect()
    }

    pub fn total(&self) -> u64 {
        Stat::ALL.into_iter().map(|stat| self.get(stat)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for stat in Stat::ALL {
            assert_eq!(stat.as_str().parse::<Stat>().unwrap(), stat);
        }
        assert!("frames".parse::<Stat>().is_err());
    }

    #[test]
    fn test_increment_and_map() {
        let mut stats = Statistics::default();
        stats.increment(Stat::CanvasOperationsSpoofed);
        stats.increment(Stat::CanvasOperationsSpoofed);
        stats.increment(Stat::WebrtcConnectionsProtected);

        let map = stats.to_map();
        assert_eq!(map.len(), Stat::ALL.len());
        assert_eq!(map["canvas_operations_spoofed"], 2);
        assert_eq!(map["webrtc_connections_protected"], 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_serialized_names_match() {
        let json = serde_json::to_value(Statistics::default()).unwrap();
        for stat in Stat::ALL {
            assert!(json.get(stat.as_str()).is_some(), "{}", stat);
        }
    }
}
