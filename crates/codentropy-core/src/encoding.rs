//! Code ⇄ bit-sequence codec.
//!
//! Codes are strings over a 32-symbol alphabet: digits 2-9 plus letters A-Z
//! with I and O omitted (the usual human-transcription-safe base-32 set).
//! Each symbol maps to its 0-31 ordinal and is emitted as a 5-bit big-endian
//! group, so a code of length L encodes to exactly 5·L bits.

use std::fmt;

/// The 32-character alphabet. Index == symbol ordinal.
pub const ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Bits per encoded symbol (2^5 = 32).
pub const BITS_PER_SYMBOL: usize = 5;

/// Errors from encoding or decoding a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Code was empty after trimming.
    Empty,
    /// Code contains a character outside the 32-symbol alphabet.
    InvalidCharacter(char),
    /// Bit sequence length is not a multiple of 5.
    InvalidLength(usize),
    /// A 5-bit group decoded to a value outside the alphabet.
    ValueOutOfRange(usize),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::Empty => write!(f, "code is empty"),
            EncodingError::InvalidCharacter(c) => write!(
                f,
                "invalid character '{c}' in code (valid characters: {})",
                std::str::from_utf8(ALPHABET).unwrap_or("")
            ),
            EncodingError::InvalidLength(n) => {
                write!(f, "bit sequence length {n} is not a multiple of 5")
            }
            EncodingError::ValueOutOfRange(v) => write!(f, "invalid 5-bit group value: {v}"),
        }
    }
}

impl std::error::Error for EncodingError {}

/// Ordinal of an (already uppercased) character, or None if outside the alphabet.
fn ordinal(c: char) -> Option<usize> {
    ALPHABET.iter().position(|&a| a as char == c)
}

/// Encode a code string into its bit sequence (one `u8` per bit, 0 or 1).
///
/// Input is uppercased and trimmed first. Every character must belong to the
/// alphabet; validation happens before any bit is produced.
pub fn encode(code: &str) -> Result<Vec<u8>, EncodingError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(EncodingError::Empty);
    }

    let mut ordinals = Vec::with_capacity(code.chars().count());
    for c in code.chars() {
        match ordinal(c) {
            Some(v) => ordinals.push(v),
            None => return Err(EncodingError::InvalidCharacter(c)),
        }
    }

    let mut bits = Vec::with_capacity(ordinals.len() * BITS_PER_SYMBOL);
    for v in ordinals {
        for shift in (0..BITS_PER_SYMBOL).rev() {
            bits.push(((v >> shift) & 1) as u8);
        }
    }
    Ok(bits)
}

/// Decode a bit sequence back to its code string.
///
/// Length must be a multiple of 5. Each group's value is range-checked; for
/// bits produced by [`encode`] the check cannot fire, but malformed input
/// (e.g. a "bit" greater than 1) is rejected rather than wrapped.
pub fn decode(bits: &[u8]) -> Result<String, EncodingError> {
    if bits.len() % BITS_PER_SYMBOL != 0 {
        return Err(EncodingError::InvalidLength(bits.len()));
    }

    let mut code = String::with_capacity(bits.len() / BITS_PER_SYMBOL);
    for group in bits.chunks_exact(BITS_PER_SYMBOL) {
        let value = group.iter().fold(0usize, |v, &b| v * 2 + b as usize);
        if value >= ALPHABET.len() {
            return Err(EncodingError::ValueOutOfRange(value));
        }
        code.push(ALPHABET[value] as char);
    }
    Ok(code)
}

/// Check alphabet membership without erroring. Empty codes are invalid.
pub fn validate(code: &str) -> bool {
    let code = code.trim().to_uppercase();
    !code.is_empty() && code.chars().all(|c| ordinal(c).is_some())
}
