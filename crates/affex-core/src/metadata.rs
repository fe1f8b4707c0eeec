//! Document metadata embedded as plain JSON in the raw file.
//!
//! Affinity files carry a small uncompressed JSON object starting with
//! `{"document"`. We take everything up to the first `}}` and hand it to
//! `serde_json`; if that fails the document simply has no metadata.

use crate::error::{Error, Result};
use crate::scanner::{find_subsequence, METADATA_PREFIX};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, trace};

/// Closing sequence that ends the metadata object
pub const METADATA_TERMINATOR: &[u8] = b"}}";

/// Finds and parses the metadata object in raw file bytes
pub fn locate_metadata(raw: &[u8]) -> Option<Value> {
    let start = find_subsequence(raw, METADATA_PREFIX.as_bytes())?;
    trace!("Found metadata prefix at offset {}", start);

    let Some(relative_end) = find_subsequence(&raw[start..], METADATA_TERMINATOR) else {
        debug!("Metadata at offset {} is not terminated", start);
        return None;
    };
    let end = start + relative_end + METADATA_TERMINATOR.len();

    match serde_json::from_slice(&raw[start..end]) {
        Ok(value) => {
            debug!("Parsed {} bytes of document metadata", end - start);
            Some(value)
        }
        Err(e) => {
            debug!("Ignoring malformed metadata at offset {}: {}", start, e);
            None
        }
    }
}

/// Reads a file and looks for its metadata object
pub fn read_metadata(path: impl AsRef<Path>) -> Result<Option<Value>> {
    let path = path.as_ref();
    let raw = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    Ok(locate_metadata(&raw))
}
