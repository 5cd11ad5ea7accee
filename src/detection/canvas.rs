//! Canvas 2-D usage heuristics.
//!
//! Canvas fingerprinting draws a little and reads back a lot. Three checks,
//! any one flags the surface:
//!
//! 1. More than two reads per draw, or any read with nothing drawn.
//! 2. More than two consecutive reads in the log, or reads making up over
//!    half of a log of at least three entries.
//! 3. More than ten draws plus reads within one second of the first
//!    recorded operation.

use std::time::Duration;

use super::{longest_run, Heuristic, OperationCategory, UsagePolicy, UsageStats, Verdict};
use OperationCategory::{DataUrlExport, Draw, ImageDataRead, Read, Text};

const MAX_READS_PER_DRAW: f64 = 2.0;
const MAX_CONSECUTIVE_READS: usize = 2;
const MIN_SEQUENCE_LEN: usize = 3;
const BURST_OPERATIONS: u64 = 10;
const BURST_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
pub struct CanvasPolicy;

impl CanvasPolicy {
    fn is_read(&self, operation: &str) -> bool {
        self.categorize(operation).contains(&Read)
    }
}

impl UsagePolicy for CanvasPolicy {
    const KIND: &'static str = "canvas";

    fn categorize(&self, operation: &str) -> &'static [OperationCategory] {
        match operation {
            "fillRect" | "strokeRect" | "drawImage" => &[Draw],
            "fillText" | "strokeText" => &[Draw, Text],
            "measureText" => &[Text],
            "getImageData" => &[Read, ImageDataRead],
            "toDataURL" => &[Read, DataUrlExport],
            _ => &[],
        }
    }

    fn evaluate(&self, stats: &UsageStats) -> Verdict {
        let draws = stats.count(Draw);
        let reads = stats.count(Read);
        let mut verdict = Verdict::default();

        let ratio = if draws == 0 {
            reads > 0
        } else {
            reads as f64 / draws as f64 > MAX_READS_PER_DRAW
        };
        verdict.flag_if(ratio, Heuristic::ReadWriteRatio);

        let sequence = stats.log_len() >= MIN_SEQUENCE_LEN && {
            let consecutive = longest_run(stats.log(), |op| self.is_read(op), |_| true);
            let logged_reads = stats.log().filter(|op| self.is_read(op)).count();
            consecutive > MAX_CONSECUTIVE_READS || logged_reads * 2 > stats.log_len()
        };
        verdict.flag_if(sequence, Heuristic::SuspiciousSequence);

        let burst = draws + reads > BURST_OPERATIONS && stats.span() < BURST_WINDOW;
        verdict.flag_if(burst, Heuristic::BurstTiming);

        verdict
    }
}
