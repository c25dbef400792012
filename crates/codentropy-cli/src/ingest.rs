//! Code ingestion: every non-empty trimmed cell of every CSV row is one code.
//!
//! Plain line-oriented files work too — a row with no commas is a single
//! cell. The core makes no assumption about the source format; this is the
//! one place that knows it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Read codes from a CSV file, optionally capped at `limit`.
pub fn read_codes(path: &Path, limit: Option<usize>) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut codes = Vec::new();
    for line in reader.lines() {
        for cell in line?.split(',') {
            let code = cell.trim();
            if code.is_empty() {
                continue;
            }
            codes.push(code.to_string());
            if limit.is_some_and(|cap| codes.len() >= cap) {
                return Ok(codes);
            }
        }
    }
    Ok(codes)
}
