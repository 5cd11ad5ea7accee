//! WebGL usage heuristics.
//!
//! Any one of these flags a context:
//!
//! 1. More than ten parameter, extension and shader queries per render call,
//!    or more than five queries with nothing rendered.
//! 2. A run of more than five queries with no render in between.
//! 3. Three or more distinct identity parameters (vendor, renderer, version,
//!    shading language) queried.

use super::{longest_run, Heuristic, OperationCategory, UsagePolicy, UsageStats, Verdict};
use crate::gl::GlParameter;
use OperationCategory::{Buffer, ExtensionQuery, ParameterQuery, Render, ShaderQuery, Texture};

const MAX_QUERIES_PER_RENDER: f64 = 10.0;
const MAX_QUERIES_WITHOUT_RENDER: u64 = 5;
const MAX_CONSECUTIVE_QUERIES: usize = 5;
const MIN_SEQUENCE_LEN: usize = 5;
const PROBED_IDENTITY_THRESHOLD: usize = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct WebGlPolicy;

impl WebGlPolicy {
    fn is_query(&self, operation: &str) -> bool {
        self.categorize(operation)
            .iter()
            .any(|c| matches!(c, ParameterQuery | ExtensionQuery | ShaderQuery))
    }

    fn is_render(&self, operation: &str) -> bool {
        self.categorize(operation).contains(&Render)
    }
}

impl UsagePolicy for WebGlPolicy {
    const KIND: &'static str = "webgl";

    fn categorize(&self, operation: &str) -> &'static [OperationCategory] {
        match operation {
            "getParameter" => &[ParameterQuery],
            "getSupportedExtensions" | "getExtension" => &[ExtensionQuery],
            "getShaderPrecisionFormat" => &[ShaderQuery],
            "drawArrays" | "drawElements" => &[Render],
            op if op.contains("Buffer") || op.starts_with("buffer") => &[Buffer],
            op if op.contains("Texture") || op.starts_with("texImage") => &[Texture],
            _ => &[],
        }
    }

    fn observe(&self, stats: &mut UsageStats, operation: &str, parameters: &str) {
        if operation != "getParameter" {
            return;
        }
        if let Some(identity) = GlParameter::parse(parameters).and_then(GlParameter::identity) {
            stats.note_probe(identity);
        }
    }

    fn evaluate(&self, stats: &UsageStats) -> Verdict {
        let queries =
            stats.count(ParameterQuery) + stats.count(ExtensionQuery) + stats.count(ShaderQuery);
        let renders = stats.count(Render);
        let mut verdict = Verdict::default();

        let ratio = if renders == 0 {
            queries > MAX_QUERIES_WITHOUT_RENDER
        } else {
            queries as f64 / renders as f64 > MAX_QUERIES_PER_RENDER
        };
        verdict.flag_if(ratio, Heuristic::ReadWriteRatio);

        let sequence = stats.log_len() >= MIN_SEQUENCE_LEN
            && longest_run(
                stats.log(),
                |op| self.is_query(op),
                |op| self.is_render(op),
            ) > MAX_CONSECUTIVE_QUERIES;
        verdict.flag_if(sequence, Heuristic::SuspiciousSequence);

        verdict.flag_if(
            stats.probed_parameters().len() >= PROBED_IDENTITY_THRESHOLD,
            Heuristic::ParameterProbing,
        );

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::super::WebGlUsageDetector;
    use super::*;

    #[test]
    fn test_identity_reads_flagged() {
        let detector = WebGlUsageDetector::new();
        for param in ["VENDOR", "RENDERER", "VERSION"] {
            detector.record("gl", "getParameter", param);
        }
        assert!(detector.classify("gl"));
        let verdict = detector.verdict("gl").unwrap();
        assert!(verdict.fired(Heuristic::ParameterProbing));
        assert!(!verdict.fired(Heuristic::ReadWriteRatio));
    }

    #[test]
    fn test_hex_identity_flagged() {
        let detector = WebGlUsageDetector::new();
        detector.record("gl", "drawArrays", "");
        for param in ["0x1F00", "0x9246", "0x8B8C"] {
            detector.record("gl", "getParameter", param);
        }
        assert!(detector
            .verdict("gl")
            .unwrap()
            .fired(Heuristic::ParameterProbing));
    }

    #[test]
    fn test_repeated_identity_counts_once() {
        let detector = WebGlUsageDetector::new();
        detector.record("gl", "drawElements", "");
        for param in ["VENDOR", "UNMASKED_VENDOR_WEBGL", "0x1F00"] {
            detector.record("gl", "getParameter", param);
        }
        assert!(!detector.classify("gl"));
        assert_eq!(detector.snapshot("gl").unwrap().probed_parameters().len(), 1);
    }

    #[test]
    fn test_queries_without_render() {
        let detector = WebGlUsageDetector::new();
        for _ in 0..5 {
            detector.record("gl", "getParameter", "MAX_TEXTURE_SIZE");
        }
        assert!(!detector.classify("gl"));
        detector.record("gl", "getSupportedExtensions", "");
        assert!(detector.classify("gl"));
    }

    #[test]
    fn test_query_run_resets_on_render() {
        let detector = WebGlUsageDetector::new();
        for _ in 0..3 {
            detector.record("gl", "drawArrays", "");
            for _ in 0..5 {
                detector.record("gl", "getShaderPrecisionFormat", "");
            }
        }
        // 15 queries over 3 renders stays under the ratio, and no run exceeds 5.
        assert!(!detector.classify("gl"));

        detector.record("gl", "bindBuffer", "");
        detector.record("gl", "getParameter", "MAX_VARYING_VECTORS");
        let verdict = detector.verdict("gl").unwrap();
        assert!(verdict.fired(Heuristic::SuspiciousSequence));
    }

    #[test]
    fn test_categories() {
        let policy = WebGlPolicy;
        assert_eq!(policy.categorize("bufferData"), &[Buffer]);
        assert!(policy.categorize("viewport").is_empty());
        assert_eq!(policy.categorize("bindBuffer"), &[Buffer]);
        assert_eq!(policy.categorize("bindTexture"), &[Texture]);
        assert_eq!(policy.categorize("texImage2D"), &[Texture]);
        assert_eq!(policy.categorize("drawArrays"), &[Render]);
    }
}
