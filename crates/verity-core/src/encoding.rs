//! # Hex and Multibase Helpers
//!
//! Lowercase hex is the wire encoding for digests, signatures and key
//! material across the pipeline. Public keys inside DID documents use
//! multibase with the base16 prefix `f`, which is plain lowercase hex
//! behind a one-character tag.

use crate::error::ValidationError;

/// Multibase prefix for lowercase base16.
pub const MULTIBASE_BASE16: char = 'f';

/// Render bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string (either case, surrounding whitespace ignored).
pub fn from_hex(hex: &str) -> Result<Vec<u8>, ValidationError> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(ValidationError::InvalidEncoding(format!(
            "hex string must have even length, got {}",
            hex.len()
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    ValidationError::InvalidEncoding(format!("invalid hex at position {i}"))
                })
        })
        .collect()
}

/// Decode a hex string that must be exactly `N` bytes long.
pub fn from_hex_array<const N: usize>(hex: &str) -> Result<[u8; N], ValidationError> {
    let bytes = from_hex(hex)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        ValidationError::InvalidEncoding(format!("expected {N} bytes, got {}", v.len()))
    })
}

/// Whether `s` is exactly 64 hex characters.
pub fn is_hex_32(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Short prefix for `Debug` output of keys and signatures.
pub fn hex_prefix(bytes: &[u8]) -> String {
    to_hex(&bytes[..bytes.len().min(4)])
}

/// Encode bytes as multibase base16 (`f` + lowercase hex).
pub fn to_multibase(bytes: &[u8]) -> String {
    format!("{MULTIBASE_BASE16}{}", to_hex(bytes))
}

/// Decode a multibase string. Only base16 (`f`/`F`) is supported.
pub fn from_multibase(s: &str) -> Result<Vec<u8>, ValidationError> {
    let mut chars = s.chars();
    match chars.next() {
        Some('f') | Some('F') => from_hex(chars.as_str()),
        Some(other) => Err(ValidationError::InvalidEncoding(format!(
            "unsupported multibase prefix {other:?}; only base16 ('f') is accepted"
        ))),
        None => Err(ValidationError::InvalidEncoding(
            "empty multibase string".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0u8, 1, 0xab, 0xff];
        let hex = to_hex(&bytes);
        assert_eq!(hex, "0001abff");
        assert_eq!(from_hex(&hex).unwrap(), bytes);
        assert_eq!(from_hex("0001ABFF").unwrap(), bytes);
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(from_hex("abc").is_err());
        assert!(from_hex("zz").is_err());
        assert!(from_hex("é0").is_err());
    }

    #[test]
    fn fixed_width_decode() {
        let arr: [u8; 2] = from_hex_array("beef").unwrap();
        assert_eq!(arr, [0xbe, 0xef]);
        assert!(from_hex_array::<3>("beef").is_err());
    }

    #[test]
    fn multibase_base16() {
        let mb = to_multibase(&[0xde, 0xad]);
        assert_eq!(mb, "fdead");
        assert_eq!(from_multibase(&mb).unwrap(), vec![0xde, 0xad]);
        assert!(from_multibase("z6MkqYq").is_err());
        assert!(from_multibase("").is_err());
    }

    #[test]
    fn hex_32_check() {
        assert!(is_hex_32(&"ab".repeat(32)));
        assert!(!is_hex_32(&"ab".repeat(31)));
        assert!(!is_hex_32(&"zz".repeat(32)));
    }
}
