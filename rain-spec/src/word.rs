//! 256-bit constant words.
//!
//! Every constant in a deployed artifact is one 256-bit unsigned integer,
//! the width of a single VM stack item. Words are stored big-endian, the
//! byte order the artifact serializes them in.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A 256-bit unsigned integer, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word256([u8; 32]);

/// Errors from parsing a textual integer literal into a [`Word256`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WordError {
    /// The literal is syntactically valid but wider than 256 bits.
    #[error("value out of range: {0} does not fit in 256 bits")]
    Overflow(String),

    /// The literal is not a decimal or `0x` hexadecimal integer.
    #[error("invalid integer literal: {0}")]
    Malformed(String),
}

impl Word256 {
    pub const ZERO: Word256 = Word256([0x00; 32]);

    /// The canonical value of the `MaxUint256` / `Infinity` sentinel.
    pub const MAX: Word256 = Word256([0xff; 32]);

    /// Construct from big-endian bytes.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Word256(bytes)
    }

    /// The big-endian byte representation.
    pub const fn as_be_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a decimal or `0x`-prefixed hexadecimal literal.
    pub fn parse(text: &str) -> Result<Self, WordError> {
        let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (text, 10),
        };
        if digits.is_empty() {
            return Err(WordError::Malformed(text.to_string()));
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| WordError::Malformed(text.to_string()))?;
        if value.bits() > 256 {
            return Err(WordError::Overflow(text.to_string()));
        }
        let be = value.to_bytes_be();
        let mut bytes = [0u8; 32];
        bytes[32 - be.len()..].copy_from_slice(&be);
        Ok(Word256(bytes))
    }
}

impl From<u64> for Word256 {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Word256(bytes)
    }
}

impl From<u128> for Word256 {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Word256(bytes)
    }
}

impl fmt::Display for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Minimal hex form, no leading zero bytes.
        let first = self.0.iter().position(|&b| b != 0).unwrap_or(31);
        write!(f, "0x{:x}", self.0[first])?;
        for &b in &self.0[first + 1..] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word256({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Word256::parse("0").unwrap(), Word256::ZERO);
        assert_eq!(Word256::parse("9").unwrap(), Word256::from(9u64));
        assert_eq!(
            Word256::parse("340282366920938463463374607431768211456").unwrap(),
            Word256::from_be_bytes({
                let mut b = [0u8; 32];
                b[15] = 1; // 2^128
                b
            })
        );
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Word256::parse("0xff").unwrap(), Word256::from(255u64));
        assert_eq!(Word256::parse("0XFF").unwrap(), Word256::from(255u64));
        let max = "0x".to_string() + &"ff".repeat(32);
        assert_eq!(Word256::parse(&max).unwrap(), Word256::MAX);
    }

    #[test]
    fn test_parse_overflow() {
        let too_wide = "0x1".to_string() + &"00".repeat(32);
        assert!(matches!(
            Word256::parse(&too_wide),
            Err(WordError::Overflow(_))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(Word256::parse(""), Err(WordError::Malformed(_))));
        assert!(matches!(Word256::parse("0x"), Err(WordError::Malformed(_))));
        assert!(matches!(
            Word256::parse("12a4"),
            Err(WordError::Malformed(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Word256::from(0u64).to_string(), "0x0");
        assert_eq!(Word256::from(0x1a2bu64).to_string(), "0x1a2b");
        assert_eq!(Word256::MAX.to_string(), format!("0x{}", "ff".repeat(32)));
    }
}
