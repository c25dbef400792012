//! Per-code orchestration: encode, run the full battery, assemble one record.
//!
//! [`CodeAnalyzer`] is the explicit per-worker context object. It is
//! constructed once per worker with the run's significance threshold and
//! reused for every code that worker processes; the battery itself is
//! stateless, so reuse is safe.
//!
//! Faults never escape this boundary: an encoding error or a panic inside a
//! battery computation becomes an [`ErrorRecord`] ("could not be evaluated"),
//! distinct from a record whose tests statistically failed.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::battery::{self, DEFAULT_ALPHA, TestOutcome};
use crate::encoding;

/// Battery test names, in reporting order.
pub const TEST_NAMES: [&str; 9] = [
    "frequency",
    "block_frequency",
    "runs",
    "longest_run",
    "serial",
    "approximate_entropy",
    "spectral",
    "poker",
    "overlapping_patterns",
];

/// Full battery result for one successfully evaluated code.
///
/// Immutable once produced. `overall_passed` is always exactly the
/// conjunction of the nine per-test `passed` flags; the entropy metric is
/// informational and excluded from the conjunction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeRecord {
    pub code: String,
    pub monobit_entropy: f64,
    pub frequency: TestOutcome,
    pub block_frequency: TestOutcome,
    pub runs: TestOutcome,
    pub longest_run: TestOutcome,
    pub serial: TestOutcome,
    pub approximate_entropy: TestOutcome,
    pub spectral: TestOutcome,
    pub poker: TestOutcome,
    pub overlapping_patterns: TestOutcome,
    pub overall_passed: bool,
}

impl CodeRecord {
    /// Per-test outcomes paired with their names, in reporting order.
    pub fn outcomes(&self) -> [(&'static str, TestOutcome); 9] {
        [
            (TEST_NAMES[0], self.frequency),
            (TEST_NAMES[1], self.block_frequency),
            (TEST_NAMES[2], self.runs),
            (TEST_NAMES[3], self.longest_run),
            (TEST_NAMES[4], self.serial),
            (TEST_NAMES[5], self.approximate_entropy),
            (TEST_NAMES[6], self.spectral),
            (TEST_NAMES[7], self.poker),
            (TEST_NAMES[8], self.overlapping_patterns),
        ]
    }
}

/// Record for a code that could not be evaluated at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub code: String,
    pub error: String,
    /// Always false: an unevaluable code never counts as passing.
    pub overall_passed: bool,
}

/// One batch output item: either a full battery report or an error record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisRecord {
    Report(CodeRecord),
    Failed(ErrorRecord),
}

impl AnalysisRecord {
    pub fn code(&self) -> &str {
        match self {
            AnalysisRecord::Report(r) => &r.code,
            AnalysisRecord::Failed(e) => &e.code,
        }
    }

    pub fn overall_passed(&self) -> bool {
        match self {
            AnalysisRecord::Report(r) => r.overall_passed,
            AnalysisRecord::Failed(_) => false,
        }
    }

    pub fn report(&self) -> Option<&CodeRecord> {
        match self {
            AnalysisRecord::Report(r) => Some(r),
            AnalysisRecord::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisRecord::Report(_) => None,
            AnalysisRecord::Failed(e) => Some(&e.error),
        }
    }
}

/// Per-worker analysis context: the significance threshold plus the battery.
#[derive(Debug, Clone)]
pub struct CodeAnalyzer {
    alpha: f64,
}

impl Default for CodeAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl CodeAnalyzer {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Evaluate one code: encode it and run the full battery.
    ///
    /// Never panics and never returns an error; every fault is downgraded to
    /// an [`ErrorRecord`] so batch processing of other codes is unaffected.
    pub fn evaluate(&self, code: &str) -> AnalysisRecord {
        let bits = match encoding::encode(code) {
            Ok(bits) => bits,
            Err(e) => return error_record(code, e.to_string()),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.run_battery(code, &bits))) {
            Ok(record) => AnalysisRecord::Report(record),
            Err(payload) => error_record(code, panic_message(&payload)),
        }
    }

    /// Run the entropy metric and all nine tests over one bit sequence.
    ///
    /// The tests are mutually independent and read-only over the same slice;
    /// invocation order carries no meaning.
    pub fn run_battery(&self, code: &str, bits: &[u8]) -> CodeRecord {
        let alpha = self.alpha;

        let monobit_entropy = battery::monobit_entropy(bits);
        let frequency = battery::frequency(bits, alpha);
        let block_frequency = battery::block_frequency(bits, alpha);
        let runs = battery::runs(bits, alpha);
        let longest_run = battery::longest_run_of_ones(bits, alpha);
        let serial = battery::serial(bits, alpha);
        let approximate_entropy = battery::approximate_entropy(bits, alpha);
        let spectral = battery::spectral(bits, alpha);
        let poker = battery::poker(bits, alpha);
        let overlapping_patterns = battery::overlapping_patterns(bits, alpha);

        let overall_passed = [
            frequency,
            block_frequency,
            runs,
            longest_run,
            serial,
            approximate_entropy,
            spectral,
            poker,
            overlapping_patterns,
        ]
        .iter()
        .all(|outcome| outcome.passed);

        CodeRecord {
            code: code.trim().to_uppercase(),
            monobit_entropy,
            frequency,
            block_frequency,
            runs,
            longest_run,
            serial,
            approximate_entropy,
            spectral,
            poker,
            overlapping_patterns,
            overall_passed,
        }
    }
}

fn error_record(code: &str, error: String) -> AnalysisRecord {
    AnalysisRecord::Failed(ErrorRecord {
        code: code.to_string(),
        error,
        overall_passed: false,
    })
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "battery computation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_is_conjunction_of_nine_flags() {
        let analyzer = CodeAnalyzer::default();
        for code in ["22222222", "HJKLMN2P", "ZZZZZZZZZZZZZZZZ", "2Z2Z2Z2Z2Z2Z"] {
            let record = match analyzer.evaluate(code) {
                AnalysisRecord::Report(r) => r,
                AnalysisRecord::Failed(e) => panic!("unexpected error: {}", e.error),
            };
            let conjunction = record.outcomes().iter().all(|(_, o)| o.passed);
            assert_eq!(record.overall_passed, conjunction, "code {code}");
        }
    }

    #[test]
    fn all_twos_fails_frequency_and_overall() {
        let record = CodeAnalyzer::default()
            .evaluate("22222222")
            .report()
            .cloned()
            .expect("valid code");
        assert!(!record.frequency.passed);
        assert!(!record.overall_passed);
        assert_eq!(record.monobit_entropy, 0.0);
    }

    #[test]
    fn short_code_skips_longest_run() {
        // 8 symbols -> 40 bits, well under the 128-bit minimum.
        let record = CodeAnalyzer::default()
            .evaluate("HJKLMN2P")
            .report()
            .cloned()
            .expect("valid code");
        assert_eq!(record.longest_run.p_value, 1.0);
        assert!(record.longest_run.passed);
        assert_eq!(record.poker.p_value, 1.0);
        assert_eq!(record.overlapping_patterns.p_value, 1.0);
    }

    #[test]
    fn invalid_code_becomes_error_record() {
        let record = CodeAnalyzer::default().evaluate("ABCI2345");
        assert_eq!(record.code(), "ABCI2345");
        assert!(!record.overall_passed());
        assert!(record.error().unwrap().contains('I'));
        assert!(record.report().is_none());
    }

    #[test]
    fn record_code_is_normalized() {
        let record = CodeAnalyzer::default().evaluate("  hjklmn2p  ");
        assert_eq!(record.code(), "HJKLMN2P");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let analyzer = CodeAnalyzer::default();
        assert_eq!(analyzer.evaluate("B7QRST29"), analyzer.evaluate("B7QRST29"));
    }

    #[test]
    fn alpha_threshold_is_respected() {
        // With alpha = 1.0 only an exact p = 1.0 passes, so a typical code
        // fails tests it would pass at 0.01.
        let strict = CodeAnalyzer::new(1.0);
        let record = strict
            .evaluate("HJKLMN2P")
            .report()
            .cloned()
            .expect("valid code");
        assert!(record.outcomes().iter().any(|(_, o)| !o.passed));
        assert!(!record.overall_passed);
    }
}
