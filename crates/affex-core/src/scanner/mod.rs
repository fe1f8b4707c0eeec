//! Marker scanning over decompressed document streams.
//!
//! Affinity documents tag many records with short ASCII tokens. The format
//! itself is undocumented, so instead of decoding the record schema we look
//! for these tokens and read whatever sits next to them.
//!
//! ## Algorithm Overview
//!
//! 1. Search the buffer for a [`Marker`], one byte at a time, so overlapping
//!    matches are all reported
//! 2. Hand each offset to a field extractor, which reads the bytes before or
//!    after the marker
//!
//! ```
//! use affex_core::scanner::{Marker, find_all};
//!
//! let marker = Marker::new("demo", b"aa");
//! assert_eq!(find_all(b"xaaay", &marker), vec![1, 2]);
//! ```

mod decode;

use tracing::trace;

pub use decode::{
    decode_ascii, decode_utf8, name_start, read_f64_le, read_u32_le, slice_at, trim_text,
};

/// Marker trailing a layer or group name
pub const LAYER_MARKER: Marker = Marker::new("layer", b"1CgaT");

/// Marker preceding a length-prefixed text run
pub const TEXT_MARKER: Marker = Marker::new("text", b"+8ftU");

/// Marker trailing a font family name
pub const FONT_MARKER: Marker = Marker::new("font", b"+ymaF");

/// Marker preceding four little-endian doubles (x1, y1, x2, y2)
pub const BOUNDS_MARKER: Marker = Marker::new("bounds", b"BphS");

/// Opening bytes of the JSON metadata blob in the raw file
pub const METADATA_PREFIX: Marker = Marker::new("metadata", b"{\"document\"");

/// A fixed byte sequence used as a positional anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker {
    name: &'static str,
    bytes: &'static [u8],
}

impl Marker {
    /// Creates a new marker
    pub const fn new(name: &'static str, bytes: &'static [u8]) -> Self {
        Self { name, bytes }
    }

    /// Short human-readable label, used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The raw marker bytes
    pub fn as_bytes(&self) -> &'static [u8] {
        self.bytes
    }

    /// Marker width in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-width marker
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Iterates over every offset where this marker occurs in `data`
    pub fn occurrences<'a>(&self, data: &'a [u8]) -> Occurrences<'a> {
        Occurrences::new(data, self.bytes)
    }
}

/// Iterator over the ascending offsets of a needle, overlaps included
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    haystack: &'a [u8],
    needle: &'a [u8],
    position: usize,
}

impl<'a> Occurrences<'a> {
    /// Creates an iterator over all matches of `needle` in `haystack`
    pub fn new(haystack: &'a [u8], needle: &'a [u8]) -> Self {
        Self {
            haystack,
            needle,
            position: 0,
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        // An empty needle would match everywhere; treat it as matching nowhere.
        if self.needle.is_empty() || self.position >= self.haystack.len() {
            return None;
        }

        match find_subsequence(&self.haystack[self.position..], self.needle) {
            Some(relative) => {
                let absolute = self.position + relative;
                // Resume one byte later, not past the match
                self.position = absolute + 1;
                Some(absolute)
            }
            None => {
                self.position = self.haystack.len();
                None
            }
        }
    }
}

impl std::iter::FusedIterator for Occurrences<'_> {}

/// Collects every offset at which `marker` begins in `data`
pub fn find_all(data: &[u8], marker: &Marker) -> Vec<usize> {
    let offsets: Vec<usize> = marker.occurrences(data).collect();
    trace!(
        "Marker {} matched {} time(s) in {} bytes",
        marker.name(),
        offsets.len(),
        data.len()
    );
    offsets
}

/// Find a subsequence within a byte slice
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
