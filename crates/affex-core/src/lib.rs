//! # affex-core
//!
//! A library for recovering design metadata from Affinity Designer documents
//! without a schema for their binary format.
//!
//! This crate provides the core functionality for:
//! - Scanning decompressed document streams for known marker tokens
//! - Reading layer names, text, font names and element bounds next to them
//! - Locating the JSON metadata blob stored in the raw file
//! - Assembling everything into a serializable [`ExtractionReport`]
//!
//! The extraction is heuristic. Marker bytes can collide with unrelated
//! data, so every extractor filters its candidates and silently skips
//! occurrences that do not decode.
//!
//! ## Architecture
//!
//! - [`scanner`]: Marker search and low-level byte readers
//! - [`extract`]: The four field extractors
//! - [`metadata`]: Raw-file metadata lookup
//! - [`stream`]: Obtaining the decompressed stream
//! - [`report`]: Result assembly
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use affex_core::{Extractor, ExternalExtractor};
//!
//! let report = Extractor::new().extract_file("poster.af", &ExternalExtractor::new())?;
//! println!("{}", report.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`FieldExtractor`]: Add extractors for other markers
//! - [`StreamSource`]: Swap out how the decompressed stream is obtained
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod extract;
pub mod metadata;
pub mod report;
pub mod scanner;
pub mod stream;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use extract::{
    BoundingBox, BoundingBoxes, Extraction, FieldExtractor, FontNames, LayerNames, TextContent,
};
pub use metadata::{locate_metadata, read_metadata};
pub use report::{
    extract_file, extract_stream_file, ExtractionReport, Extractor, ExtractorConfig, Fields,
};
pub use scanner::{find_all, Marker};
pub use stream::{CachedSource, CommandTemplate, ExternalExtractor, RawStream, StreamSource};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text length prefixes must be below this many bytes
pub const MAX_TEXT_LEN: usize = 500;

/// Element width and height must be below this many units
pub const MAX_ELEMENT_DIMENSION: i64 = 10_000;

/// Number of bounding boxes kept in a report
pub const MAX_REPORTED_ELEMENTS: usize = 30;

/// Shortest layer name worth reporting
pub const MIN_LAYER_NAME_LEN: usize = 2;

/// Lowercase tokens marking localized footnote and reference boilerplate
pub const TEXT_DENYLIST: &[&str] = &["siehe", "voir", "vedi", "consultar", "ver ", "endnotes"];
