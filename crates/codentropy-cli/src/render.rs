//! Rendering of batch records: JSON, flat CSV, and a human summary.
//!
//! All aggregation (pass counts, mean p-values) lives here, not in the core.

use codentropy_core::{AnalysisRecord, TEST_NAMES};

/// Pretty-printed JSON array of records (error records serialize flat, with
/// just `code`, `error` and `overall_passed`).
pub fn json(records: &[AnalysisRecord]) -> String {
    serde_json::to_string_pretty(records).expect("records serialize")
}

/// Flat CSV: one row per record, statistic cells left empty for codes that
/// could not be evaluated.
pub fn csv(records: &[AnalysisRecord]) -> String {
    let mut header = vec!["code".to_string(), "monobit_entropy".to_string()];
    for name in TEST_NAMES {
        header.push(format!("{name}_pvalue"));
        header.push(format!("{name}_passed"));
    }
    header.push("overall_passed".to_string());
    header.push("error".to_string());

    let mut lines = vec![header.join(",")];
    for record in records {
        let mut row = Vec::with_capacity(header.len());
        match record.report() {
            Some(report) => {
                row.push(csv_escape(&report.code));
                row.push(report.monobit_entropy.to_string());
                for (_, outcome) in report.outcomes() {
                    row.push(outcome.p_value.to_string());
                    row.push(outcome.passed.to_string());
                }
                row.push(report.overall_passed.to_string());
                row.push(String::new());
            }
            None => {
                row.push(csv_escape(record.code()));
                row.push(String::new());
                for _ in TEST_NAMES {
                    row.push(String::new());
                    row.push(String::new());
                }
                row.push("false".to_string());
                row.push(csv_escape(record.error().unwrap_or("")));
            }
        }
        lines.push(row.join(","));
    }
    lines.join("\n")
}

/// Human-readable aggregate report: overall pass rate plus one line per test
/// with pass count and mean p-value across evaluated codes.
pub fn summary(records: &[AnalysisRecord], alpha: f64) -> String {
    if records.is_empty() {
        return "No results to summarize.".to_string();
    }

    let total = records.len();
    let passed_overall = records.iter().filter(|r| r.overall_passed()).count();
    let errors = records.iter().filter(|r| r.error().is_some()).count();

    let mut out = Vec::new();
    out.push("=".repeat(60));
    out.push("CODE RANDOMNESS BATTERY - SUMMARY REPORT".to_string());
    out.push("=".repeat(60));
    out.push(format!("Significance Threshold (alpha): {alpha}"));
    out.push(format!("Total Codes Analyzed: {total}"));
    if errors > 0 {
        out.push(format!("Codes That Could Not Be Evaluated: {errors}"));
    }
    out.push(format!("Codes Passed All Tests: {passed_overall}"));
    out.push(format!(
        "Overall Pass Rate: {:.2}%",
        100.0 * passed_overall as f64 / total as f64
    ));
    out.push(String::new());
    out.push("Test-by-Test Results:".to_string());
    out.push("-".repeat(60));

    for (index, name) in TEST_NAMES.iter().enumerate() {
        let mut passed = 0usize;
        let mut p_sum = 0.0;
        let mut evaluated = 0usize;
        for record in records {
            if let Some(report) = record.report() {
                let (_, outcome) = report.outcomes()[index];
                if outcome.passed {
                    passed += 1;
                }
                p_sum += outcome.p_value;
                evaluated += 1;
            }
        }
        let rate = 100.0 * passed as f64 / total as f64;
        let title = title_case(name);
        if evaluated > 0 {
            out.push(format!(
                "{title:.<30} {passed:>7}/{total:<7} ({rate:>6.2}%)  avg p={:.6}",
                p_sum / evaluated as f64
            ));
        } else {
            out.push(format!("{title:.<30} {passed:>7}/{total:<7} ({rate:>6.2}%)"));
        }
    }

    out.push("=".repeat(60));
    out.join("\n")
}

/// Quote a CSV cell when it contains a delimiter, quote, or newline.
fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// "block_frequency" -> "Block Frequency"
fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
