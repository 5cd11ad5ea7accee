//! Configuration registry.
//!
//! [`FingerprintRegistry`] is the single source of configuration truth for a
//! host: it resolves the config for a browsing context (per-context override,
//! else the default), owns the device profile and behavior pattern catalogs,
//! and aggregates [`Statistics`]. Hosts construct one and share it by
//! reference or `Arc`; there is no global instance.
//!
//! All state sits behind one mutex. Installed configs are immutable
//! [`ResolvedConfig`] records behind an `Arc`, so callers drop the lock before
//! doing any noise work and never see a half-updated config.
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::config::FingerprintConfig;
//! use fingerprint_shield::registry::FingerprintRegistry;
//!
//! let registry = FingerprintRegistry::new();
//!
//! let mut bad = FingerprintConfig::new("tab-7");
//! bad.canvas.noise_level = 1.5;
//! assert!(registry.set_config("tab-7", bad).is_err());
//!
//! // The default still applies.
//! assert_eq!(registry.get_config("tab-7").profile_name, "default");
//! ```

mod statistics;

pub use statistics::{Stat, Statistics};

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{
    parse_catalog, BehaviorPattern, CatalogError, ConfigError, ConfigHash, DeviceProfile,
    FingerprintConfig, ValidationError,
};
use crate::stealth::navigator::SurfaceOverrides;

/// An installed config with its hash and cached spoofed values.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    config: FingerprintConfig,
    hash: ConfigHash,
    overrides: SurfaceOverrides,
}

impl ResolvedConfig {
    pub fn new(config: FingerprintConfig) -> Self {
        let hash = config.hash();
        let overrides = SurfaceOverrides::from_config(&config);
        Self {
            config,
            hash,
            overrides,
        }
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    pub fn hash(&self) -> ConfigHash {
        self.hash
    }

    pub fn overrides(&self) -> &SurfaceOverrides {
        &self.overrides
    }
}

impl Deref for ResolvedConfig {
    type Target = FingerprintConfig;

    fn deref(&self) -> &FingerprintConfig {
        &self.config
    }
}

struct RegistryState {
    default: Arc<ResolvedConfig>,
    contexts: HashMap<String, Arc<ResolvedConfig>>,
    device_profiles: BTreeMap<String, DeviceProfile>,
    behavior_patterns: BTreeMap<String, BehaviorPattern>,
    statistics: Statistics,
}

/// Resolves fingerprint configs per browsing context.
pub struct FingerprintRegistry {
    enabled: AtomicBool,
    state: Mutex<RegistryState>,
}

impl Default for FingerprintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn log_rejection(scope: &str, err: &ValidationError) {
    for issue in &err.issues {
        warn!("Invalid fingerprint config for {}: {}", scope, issue);
    }
    error!(
        "Rejected fingerprint config for {} ({} issue(s)); keeping previous config",
        scope,
        err.issues.len()
    );
}

fn stamped(mut config: FingerprintConfig) -> Arc<ResolvedConfig> {
    config.touch();
    Arc::new(ResolvedConfig::new(config))
}

impl FingerprintRegistry {
    /// Registry with the built-in default config.
    pub fn new() -> Self {
        Self::from_resolved(stamped(FingerprintConfig::default()))
    }

    /// Registry with a custom default config.
    pub fn with_default(config: FingerprintConfig) -> Result<Self, ValidationError> {
        if let Err(err) = config.validate() {
            log_rejection("default", &err);
            return Err(err);
        }
        Ok(Self::from_resolved(stamped(config)))
    }

    fn from_resolved(default: Arc<ResolvedConfig>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            state: Mutex::new(RegistryState {
                default,
                contexts: HashMap::new(),
                device_profiles: BTreeMap::new(),
                behavior_patterns: BTreeMap::new(),
                statistics: Statistics::default(),
            }),
        }
    }

    // ========================================================================
    // Global toggle
    // ========================================================================

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(
                "Fingerprint protection {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    // ========================================================================
    // Configs
    // ========================================================================

    /// Config for `context_id`, falling back to the default.
    pub fn get_config(&self, context_id: &str) -> Arc<ResolvedConfig> {
        let state = self.state.lock();
        state
            .contexts
            .get(context_id)
            .unwrap_or(&state.default)
            .clone()
    }

    pub fn default_config(&self) -> Arc<ResolvedConfig> {
        self.state.lock().default.clone()
    }

    pub fn has_override(&self, context_id: &str) -> bool {
        self.state.lock().contexts.contains_key(context_id)
    }

    /// Contexts with their own config, sorted.
    pub fn contexts(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().contexts.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Install a per-context config. Invalid configs are rejected and the
    /// previous config stays in place.
    pub fn set_config(
        &self,
        context_id: &str,
        config: FingerprintConfig,
    ) -> Result<(), ValidationError> {
        if let Err(err) = config.validate() {
            log_rejection(&format!("context '{}'", context_id), &err);
            return Err(err);
        }

        let resolved = stamped(config);
        let hash = resolved.hash();
        self.state
            .lock()
            .contexts
            .insert(context_id.to_string(), resolved);
        info!("Installed fingerprint config {} for context '{}'", hash, context_id);
        Ok(())
    }

    /// Drop a context's override. Returns whether one existed.
    pub fn remove_config(&self, context_id: &str) -> bool {
        let removed = self.state.lock().contexts.remove(context_id).is_some();
        if removed {
            debug!("Removed fingerprint config for context '{}'", context_id);
        }
        removed
    }

    /// Replace the default config.
    pub fn set_default(&self, config: FingerprintConfig) -> Result<(), ValidationError> {
        if let Err(err) = config.validate() {
            log_rejection("default", &err);
            return Err(err);
        }

        let resolved = stamped(config);
        let hash = resolved.hash();
        self.state.lock().default = resolved;
        info!("Installed default fingerprint config {}", hash);
        Ok(())
    }

    /// Merge `overlay` into the default config.
    pub fn merge_default(&self, overlay: &FingerprintConfig) -> Result<(), ValidationError> {
        let mut state = self.state.lock();
        let merged = state.default.config().merged_with(overlay);
        if let Err(err) = merged.validate() {
            log_rejection("default", &err);
            return Err(err);
        }
        state.default = Arc::new(ResolvedConfig::new(merged));
        debug!("Merged overlay into default fingerprint config");
        Ok(())
    }

    /// Merge `overlay` into the config `context_id` currently resolves to,
    /// and install the result as that context's override.
    pub fn merge_config(
        &self,
        context_id: &str,
        overlay: &FingerprintConfig,
    ) -> Result<(), ValidationError> {
        let mut state = self.state.lock();
        let base = state
            .contexts
            .get(context_id)
            .unwrap_or(&state.default)
            .clone();
        let merged = base.config().merged_with(overlay);
        if let Err(err) = merged.validate() {
            log_rejection(&format!("context '{}'", context_id), &err);
            return Err(err);
        }
        state
            .contexts
            .insert(context_id.to_string(), Arc::new(ResolvedConfig::new(merged)));
        debug!("Merged overlay into config for context '{}'", context_id);
        Ok(())
    }

    /// Apply a named device profile to the context's config.
    ///
    /// Returns `Ok(false)` when no such profile is loaded.
    pub fn apply_device_profile(
        &self,
        context_id: &str,
        profile_name: &str,
    ) -> Result<bool, ValidationError> {
        let mut state = self.state.lock();
        let Some(profile) = state.device_profiles.get(profile_name) else {
            warn!("Unknown device profile '{}'", profile_name);
            return Ok(false);
        };
        let base = state.contexts.get(context_id).unwrap_or(&state.default);
        let updated = profile.apply_to(base.config());
        if let Err(err) = updated.validate() {
            log_rejection(&format!("context '{}'", context_id), &err);
            return Err(err);
        }
        state
            .contexts
            .insert(context_id.to_string(), Arc::new(ResolvedConfig::new(updated)));
        info!(
            "Applied device profile '{}' to context '{}'",
            profile_name, context_id
        );
        Ok(true)
    }

    // ========================================================================
    // Config files
    // ========================================================================

    /// Parse a JSON config and install it as the default.
    pub fn load_config_json(&self, json: &str) -> Result<(), ConfigError> {
        let config = FingerprintConfig::from_json(json)?;
        self.set_default(config)?;
        Ok(())
    }

    /// Load the default config from a `.json` or `.toml` file.
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = FingerprintConfig::from_file(path)?;
        self.set_default(config)?;
        info!("Loaded fingerprint config from {}", path.display());
        Ok(())
    }

    /// Save the default config.
    pub fn save_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.default_config().config().to_file(path)
    }

    // ========================================================================
    // Catalogs
    // ========================================================================

    /// Replace the device profile catalog. On error the old catalog stays.
    pub fn load_device_profiles_json(&self, json: &str) -> Result<usize, CatalogError> {
        let profiles = parse_catalog::<DeviceProfile>(json).map_err(|e| {
            warn!("Failed to load device profiles: {}", e);
            e
        })?;
        let count = profiles.len();
        self.state.lock().device_profiles = profiles;
        info!("Loaded {} device profile(s)", count);
        Ok(count)
    }

    pub fn load_device_profiles_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, CatalogError> {
        let json = fs::read_to_string(path)?;
        self.load_device_profiles_json(&json)
    }

    /// Replace the behavior pattern catalog. On error the old catalog stays.
    pub fn load_behavior_patterns_json(&self, json: &str) -> Result<usize, CatalogError> {
        let patterns = parse_catalog::<BehaviorPattern>(json).map_err(|e| {
            warn!("Failed to load behavior patterns: {}", e);
            e
        })?;
        let count = patterns.len();
        self.state.lock().behavior_patterns = patterns;
        info!("Loaded {} behavior pattern(s)", count);
        Ok(count)
    }

    pub fn load_behavior_patterns_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<usize, CatalogError> {
        let json = fs::read_to_string(path)?;
        self.load_behavior_patterns_json(&json)
    }

    pub fn device_profile(&self, name: &str) -> Option<DeviceProfile> {
        self.state.lock().device_profiles.get(name).cloned()
    }

    /// The named profile, or an empty default one when absent.
    pub fn device_profile_or_default(&self, name: &str) -> DeviceProfile {
        self.device_profile(name).unwrap_or_else(|| {
            debug!("Device profile '{}' not found, using defaults", name);
            DeviceProfile::default()
        })
    }

    pub fn behavior_pattern(&self, name: &str) -> Option<BehaviorPattern> {
        self.state.lock().behavior_patterns.get(name).cloned()
    }

    /// The named pattern, or the default pattern when absent.
    pub fn behavior_pattern_or_default(&self, name: &str) -> BehaviorPattern {
        self.behavior_pattern(name).unwrap_or_else(|| {
            debug!("Behavior pattern '{}' not found, using defaults", name);
            BehaviorPattern::default()
        })
    }

    /// Loaded profile names, sorted.
    pub fn available_profiles(&self) -> Vec<String> {
        self.state.lock().device_profiles.keys().cloned().collect()
    }

    /// Loaded pattern names, sorted.
    pub fn available_patterns(&self) -> Vec<String> {
        self.state.lock().behavior_patterns.keys().cloned().collect()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn record(&self, stat: Stat) {
        self.state.lock().statistics.increment(stat);
    }

    /// Increment a counter by name. Returns `false` for unknown names.
    pub fn increment_stat(&self, name: &str) -> bool {
        match name.parse::<Stat>() {
            Ok(stat) => {
                self.record(stat);
                true
            }
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }

    pub fn get_statistics(&self) -> Statistics {
        self.state.lock().statistics
    }

    pub fn reset_statistics(&self) {
        self.state.lock().statistics = Statistics::default();
        debug!("Statistics reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: &str = r#"{
        "profiles": {
            "macbook": { "navigator": { "platform": "MacIntel" }, "screen": { "width": 1512, "height": 982 } },
            "gaming_pc": { "webgl": { "vendor": "NVIDIA Corporation" } }
        }
    }"#;

    #[test]
    fn test_fallback_to_default() {
        let registry = FingerprintRegistry::new();
        let config = registry.get_config("unknown");
        assert_eq!(config.profile_name, "default");
        assert!(config.created_at.is_some());
        assert!(!registry.has_override("unknown"));
    }

    #[test]
    fn test_set_and_remove_override() {
        let registry = FingerprintRegistry::new();
        registry
            .set_config("tab-1", FingerprintConfig::new("tab"))
            .unwrap();
        assert_eq!(registry.get_config("tab-1").profile_name, "tab");
        assert_eq!(registry.contexts(), vec!["tab-1".to_string()]);

        assert!(registry.remove_config("tab-1"));
        assert!(!registry.remove_config("tab-1"));
        assert_eq!(registry.get_config("tab-1").profile_name, "default");
    }

    #[test]
    fn test_rejected_config_keeps_previous() {
        let registry = FingerprintRegistry::new();
        registry
            .set_config("tab", FingerprintConfig::new("good"))
            .unwrap();
        let before = registry.get_config("tab").hash();

        let mut bad = FingerprintConfig::new("bad");
        bad.canvas.noise_level = 1.5;
        let err = registry.set_config("tab", bad).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(registry.get_config("tab").hash(), before);
    }

    #[test]
    fn test_resolved_hash_matches_config() {
        let registry = FingerprintRegistry::new();
        let resolved = registry.default_config();
        assert_eq!(resolved.hash(), resolved.config().hash());
    }

    #[test]
    fn test_merge_default() {
        let registry = FingerprintRegistry::new();
        let mut overlay = FingerprintConfig::default();
        overlay.screen.width = 2560;
        registry.merge_default(&overlay).unwrap();
        assert_eq!(registry.default_config().screen.width, 2560);

        overlay.screen.width = 0;
        assert!(registry.merge_default(&overlay).is_err());
        assert_eq!(registry.default_config().screen.width, 2560);
    }

    #[test]
    fn test_merge_config_starts_from_default() {
        let registry = FingerprintRegistry::new();
        let mut overlay = FingerprintConfig::default().with_custom_script("x()");
        overlay.profile_name.clear();
        registry.merge_config("tab", &overlay).unwrap();
        let config = registry.get_config("tab");
        assert_eq!(config.profile_name, "default");
        assert_eq!(config.custom_scripts, vec!["x()".to_string()]);
    }

    #[test]
    fn test_toggle() {
        let registry = FingerprintRegistry::new();
        assert!(registry.is_enabled());
        registry.set_enabled(false);
        assert!(!registry.is_enabled());
    }

    #[test]
    fn test_catalog_load_and_lookup() {
        let registry = FingerprintRegistry::new();
        assert_eq!(registry.load_device_profiles_json(PROFILES).unwrap(), 2);
        assert_eq!(
            registry.available_profiles(),
            vec!["gaming_pc".to_string(), "macbook".to_string()]
        );
        assert_eq!(
            registry.device_profile("macbook").and_then(|p| p.navigator).map(|n| n.platform),
            Some("MacIntel".to_string())
        );
        assert!(registry.device_profile("missing").is_none());
        assert_eq!(registry.device_profile_or_default("missing"), DeviceProfile::default());
        assert_eq!(registry.behavior_pattern_or_default("missing").keyboard.typing_speed_wpm, 60);
    }

    #[test]
    fn test_malformed_catalog_keeps_previous() {
        let registry = FingerprintRegistry::new();
        registry.load_device_profiles_json(PROFILES).unwrap();
        assert!(registry.load_device_profiles_json(r#"{"nope": {}}"#).is_err());
        assert!(registry.load_device_profiles_json("not json").is_err());
        assert_eq!(registry.available_profiles().len(), 2);
    }

    #[test]
    fn test_apply_device_profile() {
        let registry = FingerprintRegistry::new();
        registry.load_device_profiles_json(PROFILES).unwrap();
        assert!(registry.apply_device_profile("tab", "macbook").unwrap());
        let config = registry.get_config("tab");
        assert_eq!(config.device_profile, "macbook");
        assert_eq!(config.overrides().platform(), Some("MacIntel"));
        assert!(!registry.apply_device_profile("tab", "missing").unwrap());
    }

    #[test]
    fn test_statistics() {
        let registry = FingerprintRegistry::new();
        assert!(registry.increment_stat("canvas_operations_spoofed"));
        assert!(registry.increment_stat("canvas_operations_spoofed"));
        assert!(!registry.increment_stat("not_a_counter"));
        registry.record(Stat::TotalFramesProtected);

        let stats = registry.get_statistics();
        assert_eq!(stats.canvas_operations_spoofed, 2);
        assert_eq!(stats.total_frames_protected, 1);

        registry.reset_statistics();
        assert_eq!(registry.get_statistics(), Statistics::default());
    }
}
