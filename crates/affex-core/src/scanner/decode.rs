//! Low-level readers for the bytes around a marker.
//!
//! Nothing here knows the record layout. These helpers only pull fixed-width
//! little-endian values and loosely decoded strings out of a buffer, and
//! report a [`Error::Truncated`] when the buffer ends early.

use crate::error::{Error, Result};
use bytes::Buf;

/// Returns `len` bytes starting at `offset`, or a truncation error
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let available = data.len().saturating_sub(offset);
    if available < len {
        return Err(Error::truncated(offset, len, available));
    }
    Ok(&data[offset..offset + len])
}

/// Reads an unsigned little-endian 32-bit integer at `offset`
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let mut field = slice_at(data, offset, 4)?;
    Ok(field.get_u32_le())
}

/// Reads `N` consecutive little-endian IEEE-754 doubles at `offset`
pub fn read_f64_le<const N: usize>(data: &[u8], offset: usize) -> Result<[f64; N]> {
    let mut field = slice_at(data, offset, N * 8)?;
    let mut values = [0.0; N];
    for value in &mut values {
        *value = field.get_f64_le();
    }
    Ok(values)
}

/// Decodes bytes as ASCII, dropping anything outside the ASCII range
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect()
}

/// Decodes bytes as UTF-8, dropping invalid sequences instead of replacing them
pub fn decode_utf8(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());

    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                // None means the input ends inside a sequence
                let skip = e.error_len().unwrap_or(rest.len());
                bytes = &rest[skip..];
            }
        }
    }
}

/// Trims whitespace, counting the ASCII separators U+001C..=U+001F as whitespace too
pub fn trim_text(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || ('\x1c'..='\x1f').contains(&c))
}

/// Walks backward from `end` while `allowed` holds and returns where the run starts.
///
/// The walk may reach index 0, in which case the run starts at the beginning
/// of the buffer.
pub fn name_start(data: &[u8], end: usize, allowed: impl Fn(u8) -> bool) -> usize {
    data[..end]
        .iter()
        .rposition(|&b| !allowed(b))
        .map_or(0, |stop| stop + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_le() {
        let data = [0xFF, 0x0B, 0x00, 0x00, 0x00];
        assert_eq!(read_u32_le(&data, 1).unwrap(), 11);
    }

    #[test]
    fn test_read_u32_truncated() {
        let data = [0x0B, 0x00];
        let err = read_u32_le(&data, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                offset: 0,
                needed: 4,
                available: 2
            }
        ));
        // Past the end entirely
        assert!(read_u32_le(&data, 10).is_err());
    }

    #[test]
    fn test_read_f64_le() {
        let mut data = Vec::new();
        for v in [1.5f64, -2.0, 1e3, 0.25] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(read_f64_le::<4>(&data, 0).unwrap(), [1.5, -2.0, 1e3, 0.25]);
        assert!(read_f64_le::<4>(&data, 1).is_err());
    }

    #[test]
    fn test_decode_ascii_drops_high_bytes() {
        assert_eq!(decode_ascii(b"Caf\xe9 Bar"), "Caf Bar");
    }

    #[test]
    fn test_decode_utf8_drops_invalid() {
        assert_eq!(decode_utf8("Grüße".as_bytes()), "Grüße");
        assert_eq!(decode_utf8(b"ab\xffcd"), "abcd");
        // Truncated multi-byte sequence at the end
        assert_eq!(decode_utf8(b"ok\xe2\x82"), "ok");
        assert_eq!(decode_utf8(b""), "");
    }

    #[test]
    fn test_trim_text() {
        assert_eq!(trim_text("\x1fHello\x1c"), "Hello");
        assert_eq!(trim_text(" \t\x1e\n"), "");
        assert_eq!(trim_text("a\x1fb"), "a\x1fb");
    }

    #[test]
    fn test_name_start() {
        let data = b"#ab1CgaT";
        assert_eq!(name_start(data, 3, |b| b.is_ascii_alphanumeric()), 1);
        // Reaches the buffer start
        assert_eq!(name_start(b"abc", 3, |b| b.is_ascii_alphanumeric()), 0);
        // Nothing allowed before the end
        assert_eq!(name_start(b"ab#", 3, |b| b.is_ascii_alphanumeric()), 3);
        assert_eq!(name_start(b"", 0, |_| true), 0);
    }
}
