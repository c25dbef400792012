//! NIST SP 800-22 inspired randomness test battery for short bit sequences.
//!
//! Nine tests plus an informational entropy metric. Each test takes a bit
//! slice (one `u8` per bit) and the shared significance threshold `alpha`,
//! and returns a [`TestOutcome`] with a p-value and a pass/fail verdict.
//!
//! Every test applies a degenerate-input policy: when the sequence is below
//! the test's minimum viable sample size, the test returns the vacuous
//! outcome `(p = 1.0, passed)` without computing a statistic. The one
//! exception is the runs pre-test, which force-fails on a biased proportion
//! of ones. These policies are part of the battery's contract; downstream
//! pass-rate reporting depends on them.

use rustfft::{FftPlanner, num_complex::Complex};
use statrs::function::erf::erfc;
use statrs::function::gamma::gamma_ur;

/// Default significance threshold for the whole battery.
pub const DEFAULT_ALPHA: f64 = 0.01;

/// Outcome of a single randomness test: a p-value in [0, 1] and the verdict
/// `passed = p_value >= alpha`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TestOutcome {
    pub p_value: f64,
    pub passed: bool,
}

impl TestOutcome {
    fn from_p(p_value: f64, alpha: f64) -> Self {
        Self {
            p_value,
            passed: p_value >= alpha,
        }
    }

    /// Vacuous outcome for sequences too short to test.
    fn skipped() -> Self {
        Self {
            p_value: 1.0,
            passed: true,
        }
    }

    /// Forced rejection (runs pre-test).
    fn rejected() -> Self {
        Self {
            p_value: 0.0,
            passed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn count_ones(bits: &[u8]) -> usize {
    bits.iter().map(|&b| b as usize).sum()
}

/// Chi-square style p-value via the upper regularized incomplete gamma
/// function: p = Γ̄(a, stat / 2).
///
/// `gamma_ur` has a positive-domain precondition; the serial and approximate
/// entropy deltas can round slightly negative on near-degenerate input, so a
/// non-positive statistic maps to p = 1.0 (no evidence against randomness)
/// instead of a domain panic.
fn gamma_p_value(a: f64, stat: f64) -> f64 {
    if stat <= 0.0 {
        1.0
    } else {
        gamma_ur(a, stat / 2.0)
    }
}

/// Default overlapping-pattern length for the serial and approximate entropy
/// tests: m = min(5, max(2, floor(log2 n) - 2)).
fn default_pattern_length(n: usize) -> usize {
    let log2_n = (n as f64).log2().floor() as isize;
    log2_n.saturating_sub(2).clamp(2, 5) as usize
}

/// Count overlapping m-bit patterns over non-wrapping windows into a table
/// indexed by pattern value.
fn overlapping_pattern_counts(bits: &[u8], m: usize) -> Vec<u64> {
    let mut counts = vec![0u64; 1 << m];
    if bits.len() >= m {
        for window in bits.windows(m) {
            let value = window.iter().fold(0usize, |v, &b| (v << 1) | b as usize);
            counts[value] += 1;
        }
    }
    counts
}

// ---------------------------------------------------------------------------
// 0. Monobit entropy (informational, excluded from the overall verdict)
// ---------------------------------------------------------------------------

/// Binary entropy of the proportion of ones: H = -p·log2(p) - (1-p)·log2(1-p).
///
/// Returns 0.0 for an empty sequence or when p is exactly 0 or 1.
pub fn monobit_entropy(bits: &[u8]) -> f64 {
    let n = bits.len();
    if n == 0 {
        return 0.0;
    }
    let p = count_ones(bits) as f64 / n as f64;
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}

// ---------------------------------------------------------------------------
// 1. Frequency (monobit)
// ---------------------------------------------------------------------------

/// Proportion of zeros and ones over the whole sequence.
/// S = |Σ(2·bit - 1)| / √n, p = erfc(S / √2).
pub fn frequency(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    if n == 0 {
        return TestOutcome::skipped();
    }
    let s: i64 = bits.iter().map(|&b| 2 * b as i64 - 1).sum();
    let s_obs = (s as f64).abs() / (n as f64).sqrt();
    TestOutcome::from_p(erfc(s_obs / 2.0_f64.sqrt()), alpha)
}

// ---------------------------------------------------------------------------
// 2. Block frequency
// ---------------------------------------------------------------------------

/// Proportion of ones within M-bit blocks, M = min(20, max(1, n/10)).
/// χ² = 4M·Σ(πᵢ - 0.5)², p = Γ̄(N/2, χ²/2) over N = n/M blocks.
pub fn block_frequency(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    let block_size = (n / 10).clamp(1, 20);
    let num_blocks = n / block_size;
    if num_blocks == 0 {
        return TestOutcome::skipped();
    }

    let mut chi2 = 0.0;
    for block in bits.chunks_exact(block_size).take(num_blocks) {
        let proportion = count_ones(block) as f64 / block_size as f64;
        chi2 += (proportion - 0.5) * (proportion - 0.5);
    }
    chi2 *= 4.0 * block_size as f64;

    TestOutcome::from_p(gamma_p_value(num_blocks as f64 / 2.0, chi2), alpha)
}

// ---------------------------------------------------------------------------
// 3. Runs
// ---------------------------------------------------------------------------

/// Total number of maximal runs of identical bits.
///
/// Pre-test: if the proportion of ones deviates from 0.5 by at least 2/√n
/// the test fails outright with p = 0.0 (the runs statistic is meaningless
/// on biased input).
pub fn runs(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    if n == 0 {
        return TestOutcome::skipped();
    }
    let pi = count_ones(bits) as f64 / n as f64;
    let tau = 2.0 / (n as f64).sqrt();
    if (pi - 0.5).abs() >= tau {
        return TestOutcome::rejected();
    }

    let mut v = 1usize;
    for pair in bits.windows(2) {
        if pair[0] != pair[1] {
            v += 1;
        }
    }

    let nf = n as f64;
    let numerator = (v as f64 - 2.0 * nf * pi * (1.0 - pi)).abs();
    let denominator = 2.0 * (2.0 * nf).sqrt() * pi * (1.0 - pi);
    TestOutcome::from_p(erfc(numerator / denominator), alpha)
}

// ---------------------------------------------------------------------------
// 4. Longest run of ones
// ---------------------------------------------------------------------------

/// Longest run of ones within M-bit blocks, parameters selected by n.
/// Sequences shorter than 128 bits are vacuously passed.
pub fn longest_run_of_ones(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    if n < 128 {
        return TestOutcome::skipped();
    }

    // (M, K, bin thresholds, expected probabilities) per NIST table.
    let (block_size, k, thresholds, probs): (usize, usize, &[u32], &[f64]) = if n < 6272 {
        (8, 3, &[1, 2, 3, 4], &[0.2148, 0.3672, 0.2305, 0.1875])
    } else if n < 750_000 {
        (
            128,
            5,
            &[4, 5, 6, 7, 8, 9],
            &[0.1174, 0.2430, 0.2493, 0.1752, 0.1027, 0.1124],
        )
    } else {
        (
            10_000,
            6,
            &[10, 11, 12, 13, 14, 15, 16],
            &[0.0882, 0.2092, 0.2483, 0.1933, 0.1208, 0.0675, 0.0727],
        )
    };
    let num_blocks = n / block_size;
    let last = thresholds.len() - 1;

    let mut frequencies = vec![0u64; thresholds.len()];
    for block in bits.chunks_exact(block_size).take(num_blocks) {
        let mut max_run = 0u32;
        let mut current = 0u32;
        for &bit in block {
            if bit == 1 {
                current += 1;
                max_run = max_run.max(current);
            } else {
                current = 0;
            }
        }
        let bin = if max_run <= thresholds[0] {
            0
        } else if max_run >= thresholds[last] {
            last
        } else {
            // First threshold the run fits under; thresholds are ascending.
            thresholds.iter().position(|&v| max_run <= v).unwrap_or(last)
        };
        frequencies[bin] += 1;
    }

    let nf = num_blocks as f64;
    let chi2: f64 = frequencies
        .iter()
        .zip(probs)
        .map(|(&f, &pi)| {
            let expected = nf * pi;
            let diff = f as f64 - expected;
            diff * diff / expected
        })
        .sum();

    TestOutcome::from_p(gamma_p_value(k as f64 / 2.0, chi2), alpha)
}

// ---------------------------------------------------------------------------
// 5. Serial
// ---------------------------------------------------------------------------

/// ψ² statistic for the serial test over overlapping m-bit patterns.
fn psi_squared(bits: &[u8], m: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let n = bits.len() as f64;
    let counts = overlapping_pattern_counts(bits, m);
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    sum_sq * (1u64 << m) as f64 / n - n
}

/// Frequency of overlapping m-bit patterns, m = min(5, max(2, ⌊log2 n⌋ - 2)).
/// Reports min(p1, p2) over the first and second generalized serial
/// statistics; sequences shorter than 2^m bits are vacuously passed.
pub fn serial(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    let m = default_pattern_length(n);
    if n < (1 << m) {
        return TestOutcome::skipped();
    }

    let psi_m = psi_squared(bits, m);
    let psi_m1 = psi_squared(bits, m - 1);
    let psi_m2 = if m > 2 { psi_squared(bits, m - 2) } else { 0.0 };

    let delta1 = psi_m - psi_m1;
    let delta2 = psi_m - 2.0 * psi_m1 + psi_m2;

    let p1 = gamma_p_value((1u64 << (m - 2)) as f64, delta1);
    let p2 = if m > 2 {
        gamma_p_value((1u64 << (m - 3)) as f64, delta2)
    } else {
        1.0
    };

    TestOutcome::from_p(p1.min(p2), alpha)
}

// ---------------------------------------------------------------------------
// 6. Approximate entropy
// ---------------------------------------------------------------------------

/// φ(m) over a circularly wrapped sequence: every position gets a full
/// overlapping window, the tail wrapping onto the head.
fn phi(bits: &[u8], m: usize) -> f64 {
    let n = bits.len();
    let mut counts = vec![0u64; 1 << m];
    for i in 0..n {
        let mut value = 0usize;
        for j in 0..m {
            value = (value << 1) | bits[(i + j) % n] as usize;
        }
        counts[value] += 1;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n as f64;
            p * p.ln()
        })
        .sum()
}

/// Compare frequencies of overlapping m- and (m+1)-bit patterns.
/// ApEn = φ(m) - φ(m+1), χ² = 2n(ln 2 - ApEn), p = Γ̄(2^(m-1), χ²/2).
pub fn approximate_entropy(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    let m = default_pattern_length(n);
    if n < (1 << m) {
        return TestOutcome::skipped();
    }

    let apen = phi(bits, m) - phi(bits, m + 1);
    let chi2 = 2.0 * n as f64 * (std::f64::consts::LN_2 - apen);

    TestOutcome::from_p(gamma_p_value((1u64 << (m - 1)) as f64, chi2), alpha)
}

// ---------------------------------------------------------------------------
// 7. Spectral (DFT)
// ---------------------------------------------------------------------------

/// Peak heights in the discrete Fourier transform of the ±1 sequence.
///
/// τ = √(ln(1/0.05)·n); the count of sub-threshold magnitudes among the
/// first ⌊n/2⌋ bins is compared against the 95% expectation.
pub fn spectral(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    if n == 0 {
        return TestOutcome::skipped();
    }

    let mut buffer: Vec<Complex<f64>> = bits
        .iter()
        .map(|&b| Complex {
            re: 2.0 * b as f64 - 1.0,
            im: 0.0,
        })
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let nf = n as f64;
    let tau = ((1.0 / 0.05_f64).ln() * nf).sqrt();
    let n0 = 0.95 * nf / 2.0;
    let n1 = buffer[..n / 2].iter().filter(|c| c.norm() < tau).count() as f64;

    let d = (n1 - n0) / (nf * 0.95 * 0.05 / 4.0).sqrt();
    TestOutcome::from_p(erfc(d.abs() / 2.0_f64.sqrt()), alpha)
}

// ---------------------------------------------------------------------------
// 8. Poker (chi-square over 4-bit blocks)
// ---------------------------------------------------------------------------

/// Pattern length for the poker test.
const POKER_M: usize = 4;

/// Distribution of non-overlapping 4-bit blocks across all 16 pattern
/// classes, df = 15. Needs at least 5·2⁴ blocks; vacuously passed below that.
pub fn poker(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    let num_blocks = n / POKER_M;
    if num_blocks < 5 * (1 << POKER_M) {
        return TestOutcome::skipped();
    }

    let mut counts = [0u64; 1 << POKER_M];
    for block in bits.chunks_exact(POKER_M).take(num_blocks) {
        let value = block.iter().fold(0usize, |v, &b| (v << 1) | b as usize);
        counts[value] += 1;
    }

    let expected = num_blocks as f64 / (1 << POKER_M) as f64;
    let chi2: f64 = counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum();

    let df = (1 << POKER_M) as f64 - 1.0;
    TestOutcome::from_p(gamma_p_value(df / 2.0, chi2), alpha)
}

// ---------------------------------------------------------------------------
// 9. Overlapping patterns
// ---------------------------------------------------------------------------

/// Template length: nine consecutive one-bits.
const TEMPLATE_LEN: usize = 9;

/// Occurrences of the all-ones 9-bit template, counted at every shift within
/// M-bit blocks (M = max(1000, n/100), no wraparound across block
/// boundaries). χ² = Σ(fᵢ - λ)²/λ with λ = (M - 8)/2⁹, p = Γ̄(N/2, χ²/2).
pub fn overlapping_patterns(bits: &[u8], alpha: f64) -> TestOutcome {
    let n = bits.len();
    if n < TEMPLATE_LEN {
        return TestOutcome::skipped();
    }

    let block_size = (n / 100).max(1000);
    let num_blocks = n / block_size;
    if num_blocks == 0 {
        return TestOutcome::skipped();
    }

    let lambda = (block_size - TEMPLATE_LEN + 1) as f64 / (1u64 << TEMPLATE_LEN) as f64;

    let mut chi2 = 0.0;
    for block in bits.chunks_exact(block_size).take(num_blocks) {
        let occurrences = block
            .windows(TEMPLATE_LEN)
            .filter(|w| w.iter().all(|&b| b == 1))
            .count();
        let diff = occurrences as f64 - lambda;
        chi2 += diff * diff / lambda;
    }

    TestOutcome::from_p(gamma_p_value(num_blocks as f64 / 2.0, chi2), alpha)
}
