//! Scanner utilities.
//!
//! The parser is a character-class machine over the raw string; this module
//! holds the boundary finder, separator handling, identifier normalization,
//! and integer recognition it is built on. All positions are byte offsets.

/// Characters that terminate a word.
const BOUNDARIES: &[u8] = b"()<,;";

/// Smallest index of a boundary character in `text`, if any.
///
/// Boundaries are the significant delimiters `(`, `)`, `<`, the separators,
/// and the sub-expression terminator `;`.
pub fn next_boundary(text: &str) -> Option<usize> {
    text.bytes()
        .position(|b| BOUNDARIES.contains(&b) || b.is_ascii_whitespace())
}

/// True for characters that merely separate elements: whitespace and commas.
pub fn is_separator(byte: u8) -> bool {
    byte == b',' || byte.is_ascii_whitespace()
}

/// Advance `pos` past separators, stopping at `end`.
pub fn skip_separators(text: &str, mut pos: usize, end: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < end && is_separator(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// Normalize an identifier: uppercase, `-` replaced by `_`.
///
/// Re-exported from the instruction-set crate so both sides agree on the
/// alias space.
pub use rain_spec::normalize;

/// True for a decimal or `0x` hexadecimal integer literal.
pub fn is_integer(text: &str) -> bool {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit())
    } else {
        !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Parse an operand-argument integer (decimal, or hex with `0x`).
pub fn parse_integer(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        text.parse::<i64>().ok()
    }
}
