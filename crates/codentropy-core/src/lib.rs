//! # codentropy-core
//!
//! **Do your codes look like coin flips?**
//!
//! `codentropy-core` assesses whether short alphanumeric codes are
//! statistically indistinguishable from a truly random bit source. Each code
//! is deterministically mapped to a fixed-width bit sequence over a
//! 32-symbol alphabet, then run through a NIST SP 800-22 inspired battery of
//! nine randomness tests plus an entropy metric; a parallel batch engine
//! fans the battery out across millions of codes with per-code fault
//! isolation.
//!
//! ## Quick Start
//!
//! ```
//! use codentropy_core::{BatchConfig, analyze_all};
//!
//! let codes = vec!["HJKLMN2P".to_string(), "B7QRST29".to_string()];
//! let records = analyze_all(&codes, &BatchConfig::default()).unwrap();
//! assert_eq!(records.len(), 2);
//! for record in &records {
//!     println!("{}: overall_passed={}", record.code(), record.overall_passed());
//! }
//! ```
//!
//! ## Architecture
//!
//! Code → Encoder (5 bits/symbol) → Test Battery → per-code record → Batch
//! Engine → caller-owned record collection.
//!
//! Passing the battery is not a cryptographic adequacy proof; it only says
//! the encoded bits show no statistical structure these tests can see.

pub mod analyzer;
pub mod batch;
pub mod battery;
pub mod encoding;

pub use analyzer::{AnalysisRecord, CodeAnalyzer, CodeRecord, ErrorRecord, TEST_NAMES};
pub use batch::{
    BatchConfig, DEFAULT_CHUNK_SIZE, DEFAULT_PROGRESS_EVERY, PoolError, analyze_all,
    analyze_all_with_progress, default_worker_count,
};
pub use battery::{DEFAULT_ALPHA, TestOutcome};
pub use encoding::{ALPHABET, BITS_PER_SYMBOL, EncodingError, decode, encode, validate};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
