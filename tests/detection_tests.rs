//! Integration tests for the usage detectors
//!
//! Canonical canvas and WebGL patterns, bounded memory, eviction and
//! concurrent recording across surfaces.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fingerprint_shield::detection::{
    CanvasUsageDetector, Heuristic, SurfaceState, WebGlUsageDetector, MAX_LOG_ENTRIES,
};

// ============================================================================
// Canvas patterns
// ============================================================================

#[test]
fn test_canvas_read_only_pattern_flagged() {
    let detector = CanvasUsageDetector::new();
    for _ in 0..3 {
        detector.record("fp", "getImageData", "0,0,1,1");
    }
    assert!(detector.classify("fp"));
    assert_eq!(detector.state("fp"), SurfaceState::Flagged);
}

#[test]
fn test_canvas_normal_drawing_not_flagged() {
    let detector = CanvasUsageDetector::new();
    let start = Instant::now();
    let ops = ["fillRect", "getImageData", "fillRect"];
    for (i, op) in ops.iter().enumerate() {
        detector.record_at("app", op, "", start + Duration::from_millis(300 * i as u64));
    }
    assert!(!detector.classify("app"));
    assert_eq!(detector.state("app"), SurfaceState::Unflagged);
}

#[test]
fn test_canvas_text_fingerprint() {
    // The classic text fingerprint: draw a pangram, export it, measure it, export again.
    let detector = CanvasUsageDetector::new();
    detector.record("fp-text", "fillText", "Cwm fjordbank glyphs vext quiz");
    detector.record("fp-text", "toDataURL", "");
    detector.record("fp-text", "measureText", "Cwm fjordbank glyphs vext quiz");
    detector.record("fp-text", "toDataURL", "");
    detector.record("fp-text", "toDataURL", "");

    let verdict = detector.verdict("fp-text").unwrap();
    assert!(verdict.fired(Heuristic::ReadWriteRatio));
}

#[test]
fn test_unknown_surface_has_no_verdict() {
    let detector = CanvasUsageDetector::new();
    assert!(!detector.classify("ghost"));
    assert!(detector.verdict("ghost").is_none());
    assert_eq!(detector.state("ghost"), SurfaceState::Unseen);
}

// ============================================================================
// WebGL patterns
// ============================================================================

#[test]
fn test_webgl_identity_reads_flagged() {
    let detector = WebGlUsageDetector::new();
    for param in ["VENDOR", "RENDERER", "VERSION"] {
        detector.record("gl", "getParameter", param);
    }
    assert!(detector.classify("gl"));
    assert!(detector
        .verdict("gl")
        .unwrap()
        .fired(Heuristic::ParameterProbing));
}

#[test]
fn test_webgl_rendering_app_not_flagged() {
    let detector = WebGlUsageDetector::new();
    detector.record("scene", "getParameter", "MAX_TEXTURE_SIZE");
    detector.record("scene", "getExtension", "OES_texture_float");
    for _ in 0..20 {
        detector.record("scene", "bindBuffer", "");
        detector.record("scene", "bufferData", "");
        detector.record("scene", "texImage2D", "");
        detector.record("scene", "drawElements", "");
    }
    assert!(!detector.classify("scene"));
}

#[test]
fn test_canvas_and_webgl_detectors_are_separate() {
    let canvas = CanvasUsageDetector::new();
    let webgl = WebGlUsageDetector::new();
    canvas.record("shared-id", "getImageData", "");
    assert_eq!(webgl.state("shared-id"), SurfaceState::Unseen);
    assert_eq!(webgl.tracked_surfaces(), 0);
}

// ============================================================================
// Memory and lifecycle
// ============================================================================

#[test]
fn test_long_session_stays_bounded() {
    let detector = CanvasUsageDetector::new();
    let start = Instant::now();
    for i in 0..1000u64 {
        let op = if i % 2 == 0 { "fillRect" } else { "drawImage" };
        detector.record_at("long", op, "", start + Duration::from_millis(i));
    }
    let stats = detector.snapshot("long").unwrap();
    assert_eq!(stats.log_len(), MAX_LOG_ENTRIES);
    assert_eq!(stats.total_operations(), 1000);
    assert_eq!(stats.log().last(), Some("drawImage"));
}

#[test]
fn test_evict_forgets_surface() {
    let detector = WebGlUsageDetector::new();
    for param in ["VENDOR", "RENDERER", "VERSION"] {
        detector.record("gl", "getParameter", param);
    }
    assert!(detector.evict("gl"));
    assert!(!detector.evict("gl"));
    assert_eq!(detector.state("gl"), SurfaceState::Unseen);

    // A recycled id starts from scratch.
    detector.record("gl", "drawArrays", "");
    assert!(!detector.classify("gl"));
}

#[test]
fn test_clear_drops_everything() {
    let detector = CanvasUsageDetector::new();
    for id in ["a", "b", "c"] {
        detector.record(id, "fillRect", "");
    }
    assert_eq!(detector.tracked_surfaces(), 3);
    detector.clear();
    assert_eq!(detector.tracked_surfaces(), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_surfaces() {
    let detector = Arc::new(CanvasUsageDetector::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let detector = Arc::clone(&detector);
            thread::spawn(move || {
                let surface = format!("canvas-{}", t);
                for _ in 0..50 {
                    detector.record(&surface, "fillRect", "");
                }
                if t % 2 == 0 {
                    for _ in 0..200 {
                        detector.record(&surface, "getImageData", "");
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(detector.tracked_surfaces(), 8);
    for t in 0..8 {
        let surface = format!("canvas-{}", t);
        let stats = detector.snapshot(&surface).unwrap();
        assert!(stats.log_len() <= MAX_LOG_ENTRIES);
        if t % 2 == 0 {
            assert!(detector.classify(&surface), "{}", surface);
            assert_eq!(stats.total_operations(), 250);
        } else {
            assert_eq!(stats.total_operations(), 50);
        }
    }
}

#[test]
fn test_concurrent_single_surface_counts_every_operation() {
    let detector = Arc::new(WebGlUsageDetector::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let detector = Arc::clone(&detector);
            thread::spawn(move || {
                for _ in 0..250 {
                    detector.record("gl", "drawArrays", "");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(detector.snapshot("gl").unwrap().total_operations(), 1000);
}
