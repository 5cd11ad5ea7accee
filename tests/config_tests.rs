//! Integration tests for the configuration model
//!
//! Validation completeness, merge semantics, hash stability, file round trips
//! and host settings precedence.

use fingerprint_shield::config::{
    CliArgs, ConfigError, FingerprintConfig, ShieldSettings, ValidationIssue, CONFIG_VERSION,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_default_config_is_valid() {
    let config = FingerprintConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.profile_name, "default");
    assert_eq!(config.version, CONFIG_VERSION);
}

#[test]
fn test_validation_reports_every_issue() {
    let mut config = FingerprintConfig::new("");
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
    assert_eq!(err.reasons().len(), 6);
}

#[test]
fn test_disabled_surfaces_skip_their_checks() {
    let mut config = FingerprintConfig::default();
    config.navigator.enabled = false;
    config.navigator.user_agent.clear();
    config.screen.enabled = false;
    config.screen.height = 0;
    assert!(config.is_valid());
}

#[test]
fn test_noise_level_checked_even_when_canvas_disabled() {
    let mut config = FingerprintConfig::default();
    config.canvas.enabled = false;
    config.canvas.noise_level = 1.5;
    assert!(!config.is_valid());
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_self_merge_only_touches_updated_at() {
    let mut config = FingerprintConfig::new("tab").with_custom_script("a()");
    let before = config.clone();
    let copy = config.clone();

    config.merge(&copy).unwrap();

    assert!(config.content_eq(&before));
    assert_eq!(config.custom_scripts, vec!["a()".to_string()]);
    assert_eq!(config.created_at, before.created_at);
    assert!(config.updated_at >= before.updated_at);
}

#[test]
fn test_merge_replaces_enabled_subconfigs_wholesale() {
    let mut base = FingerprintConfig::default();
    base.screen.width = 2560;
    base.canvas.noise_level = 0.3;

    let mut overlay = FingerprintConfig::default();
    overlay.profile_name = String::new();
    overlay.screen.enabled = false;
    overlay.canvas.noise_level = 0.05;
    overlay.canvas.spoof_text_metrics = false;

    let merged = base.merged_with(&overlay);
    assert_eq!(merged.screen.width, 2560);
    assert_eq!(merged.canvas, overlay.canvas);
    assert_eq!(merged.profile_name, "default");
}

#[test]
fn test_merge_concatenates_scripts() {
    let mut base = FingerprintConfig::new("a").with_custom_script("x()");
    let overlay = FingerprintConfig::new("b")
        .with_custom_script("x()")
        .with_custom_script("y()");
    base.merge(&overlay).unwrap();
    assert_eq!(base.profile_name, "b");
    assert_eq!(base.custom_scripts, vec!["x()", "x()", "y()"]);
}

#[test]
fn test_failed_merge_leaves_config_untouched() {
    let mut base = FingerprintConfig::new("base");
    let before = base.clone();
    let mut overlay = FingerprintConfig::new("overlay");
    overlay.canvas.noise_level = 3.0;

    let err = base.merge(&overlay).unwrap_err();
    assert!(err.contains(&ValidationIssue::CanvasNoiseLevel(3.0)));
    assert_eq!(base, before);
}

// ============================================================================
// Hash
// ============================================================================

#[test]
fn test_hash_stable_for_equal_content() {
    let a = FingerprintConfig::new("same");
    let b = FingerprintConfig::new("same");
    assert_eq!(a.hash(), b.hash());
    assert_eq!(a.hash().to_hex().len(), 64);
}

#[test]
fn test_hash_ignores_timestamps() {
    let a = FingerprintConfig::new("same");
    let mut b = a.clone();
    b.touch();
    assert_eq!(a.hash(), b.hash());
}

#[test]
fn test_hash_changes_with_any_field() {
    let base = FingerprintConfig::default();
    let mut variants = Vec::new();

    let mut c = base.clone();
    c.canvas.noise_level = 0.2;
    variants.push(c);

    let mut c = base.clone();
    c.webgl.vendor = "Other".to_string();
    variants.push(c);

    let mut c = base.clone();
    c.timezone.timezone_offset = 60;
    variants.push(c);

    let mut c = base.clone();
    c.anti_detection.automation.max_delay_ms = 2001;
    variants.push(c);

    let mut c = base.clone();
    c.font.font_metrics_offsets.insert("Arial".to_string(), 0.1);
    variants.push(c);

    for variant in &variants {
        assert_ne!(variant.hash(), base.hash());
    }
}

// ============================================================================
// JSON / files
// ============================================================================

#[test]
fn test_json_partial_and_unknown_fields() {
    let json = r#"{
        "profile_name": "partial",
        "canvas": { "noise_level": 0.25 },
        "anti_detection": { "automation": { "min_delay_ms": 5 } },
        "custom_js_injections": ["console.log(1)"],
        "some_future_field": 42
    }"#;
    let config = FingerprintConfig::from_json(json).unwrap();
    assert_eq!(config.profile_name, "partial");
    assert_eq!(config.canvas.noise_level, 0.25);
    assert!(config.canvas.protect_data_url);
    assert_eq!(config.anti_detection.automation.min_delay_ms, 5);
    assert_eq!(config.anti_detection.automation.max_delay_ms, 2000);
    assert_eq!(config.custom_scripts, vec!["console.log(1)".to_string()]);
}

#[test]
fn test_file_round_trip_json_and_toml() {
    let dir = TempDir::new().unwrap();
    let mut config = FingerprintConfig::new("files");
    config.webgl.parameters.insert("MAX_TEXTURE_SIZE".to_string(), "8192".to_string());

    for name in ["config.json", "config.toml"] {
        let path = dir.path().join(name);
        config.to_file(&path).unwrap();
        let loaded = FingerprintConfig::from_file(&path).unwrap();
        assert!(loaded.content_eq(&config), "{}", name);
    }
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "profile_name: x").unwrap();
    assert!(matches!(
        FingerprintConfig::from_file(&path),
        Err(ConfigError::UnsupportedFormat(_))
    ));
}

// ============================================================================
// Host settings
// ============================================================================

#[test]
fn test_settings_args_override_file() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("shield.toml");
    std::fs::write(&settings_path, "enabled = true\nsession_key = \"from-file\"\n").unwrap();

    let args = CliArgs {
        settings_file: Some(settings_path),
        enabled: Some(false),
        session_key: Some("from-args".to_string()),
        ..Default::default()
    };
    let settings = args.load_settings().unwrap();
    assert!(!settings.enabled);
    assert_eq!(settings.session_key.as_deref(), Some("from-args"));
}

#[test]
fn test_settings_reject_missing_files() {
    let settings = ShieldSettings::default().with_config_path("/definitely/not/here.json");
    assert!(settings.validate().is_err());
}
