//! Length-prefixed text runs following [`TEXT_MARKER`].
//!
//! Layout after the marker: a `u32` little-endian byte count, then the
//! UTF-8 payload. Text frames carry localized footnote boilerplate as well as
//! design copy; the two look identical on disk, so a small token denylist
//! filters the former.

use super::FieldExtractor;
use crate::error::{Error, Result};
use crate::scanner::{decode_utf8, read_u32_le, trim_text, Marker, TEXT_MARKER};
use crate::{MAX_TEXT_LEN, TEXT_DENYLIST};

/// Text content extractor
#[derive(Debug, Clone)]
pub struct TextContent {
    marker: Marker,
}

impl Default for TextContent {
    fn default() -> Self {
        Self::new()
    }
}

impl TextContent {
    /// Creates a text extractor anchored on [`TEXT_MARKER`]
    pub fn new() -> Self {
        Self::with_marker(TEXT_MARKER)
    }

    /// Creates a text extractor anchored on a custom marker
    pub fn with_marker(marker: Marker) -> Self {
        Self { marker }
    }

    /// Returns the denylisted token contained in `text`, if any
    pub fn denylisted_token(text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        TEXT_DENYLIST
            .iter()
            .copied()
            .find(|token| lowered.contains(token))
    }
}

impl FieldExtractor for TextContent {
    type Item = String;

    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn read_at(&self, data: &[u8], offset: usize) -> Result<String> {
        let length_offset = offset + self.marker.len();
        let length = read_u32_le(data, length_offset)?;
        if length == 0 || length as usize >= MAX_TEXT_LEN {
            return Err(Error::LengthOutOfRange {
                offset: length_offset,
                length,
            });
        }

        // A payload running off the end is cut short, not rejected
        let start = length_offset + 4;
        let end = (start + length as usize).min(data.len());
        let decoded = decode_utf8(data.get(start..end).unwrap_or_default());
        let text = decoded.trim_end_matches('\0');

        let trimmed = trim_text(text);
        if trimmed.is_empty() {
            return Err(Error::EmptyValue { offset });
        }
        if let Some(token) = Self::denylisted_token(text) {
            return Err(Error::Denylisted { offset, token });
        }
        Ok(trimmed.to_string())
    }
}
