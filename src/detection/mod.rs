//! Online fingerprinting detection.
//!
//! A [`UsageDetector`] keeps one [`UsageStats`] record per surface and
//! re-evaluates it after every recorded operation. What counts as a read, a
//! draw or a query, and which heuristics apply, comes from a
//! [`UsagePolicy`]: [`CanvasPolicy`] for 2-D canvases and [`WebGlPolicy`] for
//! WebGL contexts.
//!
//! Memory per surface is bounded: counters, a log of the last
//! [`MAX_LOG_ENTRIES`] operation names and at most four probed identity
//! parameters. Hosts call [`UsageDetector::evict`] when a surface is
//! destroyed.
//!
//! # Example
//!
//! ```rust
//! use fingerprint_shield::detection::CanvasUsageDetector;
//!
//! let detector = CanvasUsageDetector::new();
//! detector.record("canvas-1", "getImageData", "0,0,16,16");
//! assert!(detector.classify("canvas-1"));
//! assert!(!detector.classify("never-seen"));
//! ```

mod canvas;
mod webgl;

pub use canvas::CanvasPolicy;
pub use webgl::WebGlPolicy;

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::gl::GlParameter;

/// Operation names retained per surface.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Counter buckets for recorded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationCategory {
    /// Canvas drawing (`fillRect`, `drawImage`, ...).
    Draw,
    /// Canvas pixel read-back of any kind.
    Read,
    /// `getImageData` reads.
    ImageDataRead,
    /// `toDataURL` exports.
    DataUrlExport,
    /// Text drawing or measuring.
    Text,
    ParameterQuery,
    ExtensionQuery,
    ShaderQuery,
    Buffer,
    Texture,
    /// `drawArrays` / `drawElements`.
    Render,
}

/// A heuristic that can flag a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heuristic {
    ReadWriteRatio,
    SuspiciousSequence,
    BurstTiming,
    ParameterProbing,
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heuristic::ReadWriteRatio => "read/write ratio",
            Heuristic::SuspiciousSequence => "suspicious sequence",
            Heuristic::BurstTiming => "burst timing",
            Heuristic::ParameterProbing => "parameter probing",
        };
        f.write_str(name)
    }
}

/// Heuristics that fired for a surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub triggered: Vec<Heuristic>,
}

impl Verdict {
    pub fn flag_if(&mut self, condition: bool, heuristic: Heuristic) {
        if condition {
            self.triggered.push(heuristic);
        }
    }

    /// Any heuristic fired.
    pub fn is_fingerprinting(&self) -> bool {
        !self.triggered.is_empty()
    }

    pub fn fired(&self, heuristic: Heuristic) -> bool {
        self.triggered.contains(&heuristic)
    }
}

/// Classification state of one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No operation recorded yet (or evicted).
    Unseen,
    Flagged,
    Unflagged,
}

/// Result of recording one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Surface is flagged after this operation.
    pub flagged: bool,
    /// This operation changed the flag.
    pub transitioned: bool,
}

/// Per-surface usage record.
#[derive(Debug, Clone)]
pub struct UsageStats {
    counters: BTreeMap<OperationCategory, u64>,
    log: VecDeque<String>,
    probed: BTreeSet<GlParameter>,
    first_operation: Instant,
    last_operation: Instant,
    total_operations: u64,
    flagged: bool,
}

impl UsageStats {
    fn new(at: Instant) -> Self {
        Self {
            counters: BTreeMap::new(),
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            probed: BTreeSet::new(),
            first_operation: at,
            last_operation: at,
            total_operations: 0,
            flagged: false,
        }
    }

    fn push(&mut self, operation: &str, categories: &[OperationCategory], at: Instant) {
        if self.log.len() == MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(operation.to_string());

        for category in categories {
            *self.counters.entry(*category).or_insert(0) += 1;
        }
        self.total_operations += 1;
        self.last_operation = self.last_operation.max(at);
    }

    pub fn count(&self, category: OperationCategory) -> u64 {
        self.counters.get(&category).copied().unwrap_or(0)
    }

    /// Retained operation names, oldest first.
    pub fn log(&self) -> impl Iterator<Item = &str> + '_ {
        self.log.iter().map(String::as_str)
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    pub fn total_operations(&self) -> u64 {
        self.total_operations
    }

    /// Time between the first and the last recorded operation.
    pub fn span(&self) -> Duration {
        self.last_operation.saturating_duration_since(self.first_operation)
    }

    pub fn first_operation(&self) -> Instant {
        self.first_operation
    }

    pub fn last_operation(&self) -> Instant {
        self.last_operation
    }

    /// Distinct identity parameters queried.
    pub fn probed_parameters(&self) -> &BTreeSet<GlParameter> {
        &self.probed
    }

    pub fn note_probe(&mut self, parameter: GlParameter) {
        self.probed.insert(parameter);
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }
}

/// Operation vocabulary and heuristics for one surface kind.
pub trait UsagePolicy: Default + Send + Sync {
    /// Surface kind, used in log messages.
    const KIND: &'static str;

    /// Counter buckets an operation name falls into. Empty for unknown names.
    fn categorize(&self, operation: &str) -> &'static [OperationCategory];

    /// Extra bookkeeping from the operation parameters.
    fn observe(&self, _stats: &mut UsageStats, _operation: &str, _parameters: &str) {}

    fn evaluate(&self, stats: &UsageStats) -> Verdict;
}

/// Per-surface operation tracker and classifier.
#[derive(Default)]
pub struct UsageDetector<P: UsagePolicy> {
    policy: P,
    surfaces: Mutex<HashMap<String, UsageStats>>,
}

/// Detector for 2-D canvas contexts.
pub type CanvasUsageDetector = UsageDetector<CanvasPolicy>;

/// Detector for WebGL contexts.
pub type WebGlUsageDetector = UsageDetector<WebGlPolicy>;

impl<P: UsagePolicy> UsageDetector<P> {
    pub fn new() -> Self {
        Self {
            policy: P::default(),
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    /// Record an operation on `surface_id`, creating the surface if needed.
    pub fn record(&self, surface_id: &str, operation: &str, parameters: &str) {
        self.record_at(surface_id, operation, parameters, Instant::now());
    }

    /// [`record`](Self::record) with an explicit timestamp.
    pub fn record_at(
        &self,
        surface_id: &str,
        operation: &str,
        parameters: &str,
        at: Instant,
    ) -> Observation {
        let categories = self.policy.categorize(operation);

        let mut surfaces = self.surfaces.lock();
        let stats = surfaces
            .entry(surface_id.to_string())
            .or_insert_with(|| UsageStats::new(at));

        stats.push(operation, categories, at);
        self.policy.observe(stats, operation, parameters);

        let verdict = self.policy.evaluate(stats);
        let flagged = verdict.is_fingerprinting();
        let transitioned = flagged != stats.flagged;
        if transitioned {
            stats.flagged = flagged;
            if flagged {
                debug!(
                    "{} surface '{}' flagged as fingerprinting ({:?})",
                    P::KIND,
                    surface_id,
                    verdict.triggered
                );
            } else {
                debug!("{} surface '{}' no longer flagged", P::KIND, surface_id);
            }
        }

        Observation {
            flagged,
            transitioned,
        }
    }

    /// Record an operation and return whether the surface is now flagged.
    pub fn detect(&self, surface_id: &str, operation: &str, parameters: &str) -> bool {
        self.record_at(surface_id, operation, parameters, Instant::now())
            .flagged
    }

    /// Whether the surface currently looks like fingerprinting. Unknown
    /// surfaces are not flagged.
    pub fn classify(&self, surface_id: &str) -> bool {
        self.verdict(surface_id)
            .is_some_and(|verdict| verdict.is_fingerprinting())
    }

    /// Which heuristics fire for the surface, if it has been seen.
    pub fn verdict(&self, surface_id: &str) -> Option<Verdict> {
        let surfaces = self.surfaces.lock();
        surfaces
            .get(surface_id)
            .map(|stats| self.policy.evaluate(stats))
    }

    pub fn state(&self, surface_id: &str) -> SurfaceState {
        match self.surfaces.lock().get(surface_id) {
            None => SurfaceState::Unseen,
            Some(stats) if stats.flagged => SurfaceState::Flagged,
            Some(_) => SurfaceState::Unflagged,
        }
    }

    /// Copy of the surface's record.
    pub fn snapshot(&self, surface_id: &str) -> Option<UsageStats> {
        self.surfaces.lock().get(surface_id).cloned()
    }

    /// Forget a destroyed surface. Returns whether it was tracked.
    pub fn evict(&self, surface_id: &str) -> bool {
        let removed = self.surfaces.lock().remove(surface_id).is_some();
        if removed {
            debug!("Evicted {} surface '{}'", P::KIND, surface_id);
        }
        removed
    }

    pub fn tracked_surfaces(&self) -> usize {
        self.surfaces.lock().len()
    }

    pub fn clear(&self) {
        self.surfaces.lock().clear();
    }
}

/// Longest run of consecutive log entries matching `is_hit`, where entries
/// matching `is_reset` end a run.
pub(crate) fn longest_run<'a>(
    log: impl Iterator<Item = &'a str>,
    is_hit: impl Fn(&str) -> bool,
    is_reset: impl Fn(&str) -> bool,
) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for op in log {
        if is_hit(op) {
            run += 1;
            longest = longest.max(run);
        } else if is_reset(op) {
            run = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_log_is_bounded() {
        let detector = CanvasUsageDetector::new();
        for i in 0..1000 {
            let op = if i % 2 == 0 { "fillRect" } else { "strokeRect" };
            detector.record("c", op, "");
        }
        let stats = detector.snapshot("c").unwrap();
        assert_eq!(stats.log_len(), MAX_LOG_ENTRIES);
        assert_eq!(stats.total_operations(), 1000);
        assert_eq!(stats.count(OperationCategory::Draw), 1000);
    }

    #[test]
    fn test_log_keeps_newest() {
        let detector = CanvasUsageDetector::new();
        for _ in 0..150 {
            detector.record("c", "fillRect", "");
        }
        detector.record("c", "measureText", "");
        let stats = detector.snapshot("c").unwrap();
        assert_eq!(stats.log().last(), Some("measureText"));
        assert_eq!(stats.log().next(), Some("fillRect"));
    }

    #[test]
    fn test_unknown_operations_only_logged() {
        let detector = WebGlUsageDetector::new();
        detector.record("gl", "viewport", "");
        let stats = detector.snapshot("gl").unwrap();
        assert_eq!(stats.log_len(), 1);
        assert_eq!(stats.count(OperationCategory::Render), 0);
    }

    #[test]
    fn test_state_machine() {
        let detector = CanvasUsageDetector::new();
        assert_eq!(detector.state("c"), SurfaceState::Unseen);

        detector.record("c", "fillRect", "");
        assert_eq!(detector.state("c"), SurfaceState::Unflagged);

        let first = detector.record_at("c", "getImageData", "", Instant::now());
        assert!(!first.flagged);
        let second = detector.record_at("c", "getImageData", "", Instant::now());
        let third = detector.record_at("c", "toDataURL", "", Instant::now());
        assert!(second.flagged || third.flagged);
        assert_eq!(detector.state("c"), SurfaceState::Flagged);

        assert!(detector.evict("c"));
        assert_eq!(detector.state("c"), SurfaceState::Unseen);
        assert!(!detector.evict("c"));
    }

    #[test]
    fn test_surfaces_are_independent() {
        let detector = CanvasUsageDetector::new();
        detector.record("reader", "getImageData", "");
        detector.record("painter", "fillRect", "");
        assert!(detector.classify("reader"));
        assert!(!detector.classify("painter"));
        assert_eq!(detector.tracked_surfaces(), 2);

        detector.clear();
        assert_eq!(detector.tracked_surfaces(), 0);
    }

    #[test]
    fn test_concurrent_recording() {
        let detector = Arc::new(WebGlUsageDetector::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let detector = Arc::clone(&detector);
                thread::spawn(move || {
                    let surface = format!("gl-{}", t % 2);
                    for _ in 0..250 {
                        detector.record(&surface, "drawArrays", "");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total: u64 = ["gl-0", "gl-1"]
            .iter()
            .map(|s| detector.snapshot(s).unwrap().count(OperationCategory::Render))
            .sum();
        assert_eq!(total, 2000);
    }

    #[test]
    fn test_longest_run() {
        let log = ["a", "r", "r", "x", "r", "b", "r", "r", "r"];
        let run = longest_run(log.iter().copied(), |op| op == "r", |op| op == "b");
        assert_eq!(run, 3);
    }
}
