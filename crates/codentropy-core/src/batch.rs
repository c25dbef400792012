//! Batch-parallel execution of the battery across large code collections.
//!
//! A fixed pool of worker threads drains contiguous chunks of codes from a
//! bounded queue and pushes completed records into a single-consumer channel
//! owned by the coordinator. The workload is CPU-bound numeric computation
//! with no I/O waits, so OS threads give true parallelism; chunking
//! amortizes dispatch overhead against the small per-code latency.
//!
//! Guarantees:
//! - exactly one record per input code (successes and errors), no
//!   duplicates, no omissions;
//! - completion order is unspecified when `workers > 1` — correlate by the
//!   `code` field if input order matters;
//! - `workers == 1` runs sequentially in input order with identical
//!   per-item semantics;
//! - the only fatal condition is a worker thread that cannot be spawned
//!   ([`PoolError`]); everything else is isolated per code.

use std::fmt;
use std::io;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;

use crate::analyzer::{AnalysisRecord, CodeAnalyzer};
use crate::battery::DEFAULT_ALPHA;

/// Default dispatch chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default progress-report interval (in completed codes).
pub const DEFAULT_PROGRESS_EVERY: usize = 10_000;

/// Half the available cores, at least one. The battery saturates a core per
/// worker, so leaving headroom is the friendlier default.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// Caller-supplied batch parameters. Read-only for the duration of a run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Significance threshold shared by every test invocation.
    pub alpha: f64,
    /// Worker pool size; 1 means sequential in input order.
    pub workers: usize,
    /// Codes per dispatched chunk.
    pub chunk_size: usize,
    /// Invoke the progress callback every this many completions (0 = never).
    pub progress_every: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            workers: default_worker_count(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// The worker pool could not be constructed. Fatal: aborts the batch.
#[derive(Debug)]
pub struct PoolError(io::Error);

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to spawn worker thread: {}", self.0)
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Analyze every code, returning one record per input (order unspecified
/// for `workers > 1`).
pub fn analyze_all<S>(codes: &[S], config: &BatchConfig) -> Result<Vec<AnalysisRecord>, PoolError>
where
    S: AsRef<str> + Sync,
{
    analyze_all_with_progress(codes, config, |_| {})
}

/// [`analyze_all`] with a progress callback, invoked on the coordinating
/// thread every `config.progress_every` completions with the count of codes
/// processed so far.
pub fn analyze_all_with_progress<S>(
    codes: &[S],
    config: &BatchConfig,
    mut on_progress: impl FnMut(usize),
) -> Result<Vec<AnalysisRecord>, PoolError>
where
    S: AsRef<str> + Sync,
{
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let workers = config.workers.max(1);
    if workers == 1 {
        return Ok(analyze_sequential(codes, config, &mut on_progress));
    }

    let chunk_size = config.chunk_size.max(1);
    log::debug!(
        "dispatching {} codes across {workers} workers (chunk size {chunk_size})",
        codes.len()
    );

    // Bounded job queue: the coordinator blocks on send once the pool falls
    // behind, keeping in-flight work proportional to the pool.
    let (job_tx, job_rx) = mpsc::sync_channel::<&[S]>(workers * 2);
    let job_rx = Mutex::new(job_rx);
    let (record_tx, record_rx) = mpsc::channel::<AnalysisRecord>();

    let mut results = Vec::with_capacity(codes.len());
    thread::scope(|scope| -> Result<(), PoolError> {
        for id in 0..workers {
            let job_rx = &job_rx;
            let record_tx = record_tx.clone();
            let alpha = config.alpha;
            thread::Builder::new()
                .name(format!("battery-{id}"))
                .spawn_scoped(scope, move || {
                    // One analyzer per worker, reused for every code it takes.
                    let analyzer = CodeAnalyzer::new(alpha);
                    loop {
                        let chunk = match job_rx.lock() {
                            Ok(rx) => rx.recv(),
                            Err(_) => break,
                        };
                        let Ok(chunk) = chunk else { break };
                        for code in chunk {
                            if record_tx.send(analyzer.evaluate(code.as_ref())).is_err() {
                                return;
                            }
                        }
                    }
                })
                .map_err(PoolError)?;
        }
        // Workers hold the remaining clones; the drain below ends when the
        // last worker exits.
        drop(record_tx);

        for chunk in codes.chunks(chunk_size) {
            if job_tx.send(chunk).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut processed = 0usize;
        for record in record_rx {
            results.push(record);
            processed += 1;
            if config.progress_every > 0 && processed % config.progress_every == 0 {
                on_progress(processed);
            }
        }
        Ok(())
    })?;

    log::debug!("batch complete: {} records", results.len());
    Ok(results)
}

/// Single-worker path: same per-item semantics, input order preserved as an
/// incidental property.
fn analyze_sequential<S>(
    codes: &[S],
    config: &BatchConfig,
    on_progress: &mut impl FnMut(usize),
) -> Vec<AnalysisRecord>
where
    S: AsRef<str>,
{
    let analyzer = CodeAnalyzer::new(config.alpha);
    let mut results = Vec::with_capacity(codes.len());
    for (i, code) in codes.iter().enumerate() {
        results.push(analyzer.evaluate(code.as_ref()));
        let done = i + 1;
        if config.progress_every > 0 && done % config.progress_every == 0 {
            on_progress(done);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ALPHABET;
    use std::collections::HashSet;

    /// Deterministic distinct codes over the 32-symbol alphabet.
    fn make_codes(count: usize, len: usize) -> Vec<String> {
        let mut state: u64 = 0x1234_5678_9ABC_DEF0;
        let mut codes = HashSet::new();
        while codes.len() < count {
            let mut code = String::with_capacity(len);
            for _ in 0..len {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                code.push(ALPHABET[(state >> 33) as usize % 32] as char);
            }
            codes.insert(code);
        }
        codes.into_iter().collect()
    }

    fn config(workers: usize) -> BatchConfig {
        BatchConfig {
            workers,
            chunk_size: 7,
            ..BatchConfig::default()
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let records = analyze_all::<String>(&[], &config(4)).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn batch_is_complete_for_any_worker_count() {
        let codes = make_codes(250, 8);
        let expected: HashSet<&str> = codes.iter().map(|c| c.as_str()).collect();
        for workers in [1, 2, 4, 8] {
            let records = analyze_all(&codes, &config(workers)).unwrap();
            assert_eq!(records.len(), codes.len(), "workers={workers}");
            let seen: HashSet<&str> = records.iter().map(|r| r.code()).collect();
            assert_eq!(seen, expected, "workers={workers}");
        }
    }

    #[test]
    fn parallel_matches_sequential_per_code() {
        let codes = make_codes(60, 12);
        let sequential = analyze_all(&codes, &config(1)).unwrap();
        let mut parallel = analyze_all(&codes, &config(4)).unwrap();
        for expected in &sequential {
            let pos = parallel
                .iter()
                .position(|r| r.code() == expected.code())
                .expect("record present");
            assert_eq!(&parallel.swap_remove(pos), expected);
        }
        assert!(parallel.is_empty());
    }

    #[test]
    fn invalid_codes_do_not_poison_the_batch() {
        let codes: Vec<String> = ["HJKLMN2P", "ABCI2345", "22222222", "B7QRST29"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let records = analyze_all(&codes, &config(2)).unwrap();
        assert_eq!(records.len(), 4);

        let failed: Vec<_> = records.iter().filter(|r| r.error().is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].code(), "ABCI2345");
        assert!(!failed[0].overall_passed());
    }

    #[test]
    fn sequential_mode_preserves_input_order() {
        let codes = make_codes(40, 6);
        let records = analyze_all(&codes, &config(1)).unwrap();
        let order: Vec<&str> = records.iter().map(|r| r.code()).collect();
        let input: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(order, input);
    }

    #[test]
    fn progress_fires_on_the_configured_interval() {
        let codes = make_codes(25, 6);
        for workers in [1, 3] {
            let mut ticks = Vec::new();
            let cfg = BatchConfig {
                workers,
                chunk_size: 4,
                progress_every: 10,
                ..BatchConfig::default()
            };
            analyze_all_with_progress(&codes, &cfg, |done| ticks.push(done)).unwrap();
            assert_eq!(ticks, vec![10, 20], "workers={workers}");
        }
    }

    #[test]
    fn more_workers_than_codes_is_fine() {
        let codes = make_codes(3, 8);
        let records = analyze_all(&codes, &config(16)).unwrap();
        assert_eq!(records.len(), 3);
    }
}
