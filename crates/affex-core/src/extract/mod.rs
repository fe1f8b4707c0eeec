//! Field extractors built on top of the marker scanner.
//!
//! Every extractor follows the same shape: find all occurrences of its
//! marker, try to read one value per occurrence, and keep the values that
//! pass its validity filter. A failed read only costs that occurrence.
//!
//! ## Extensibility
//!
//! The [`FieldExtractor`] trait allows custom extractors:
//!
//! ```
//! use affex_core::extract::FieldExtractor;
//! use affex_core::scanner::{slice_at, Marker};
//! use affex_core::Result;
//!
//! struct Tag;
//!
//! impl FieldExtractor for Tag {
//!     type Item = u8;
//!
//!     fn marker(&self) -> &Marker {
//!         const TAG: Marker = Marker::new("tag", b"#");
//!         &TAG
//!     }
//!
//!     fn read_at(&self, data: &[u8], offset: usize) -> Result<u8> {
//!         Ok(slice_at(data, offset + 1, 1)?[0])
//!     }
//! }
//!
//! assert_eq!(Tag.extract(b"#b#a#b#").items, vec![b'a', b'b']);
//! ```

mod bounds;
mod names;
mod text;

use crate::error::Result;
use crate::scanner::Marker;
use std::collections::BTreeSet;
use tracing::{debug, trace};

pub use bounds::{BoundingBox, BoundingBoxes};
pub use names::{FontNames, LayerNames};
pub use text::TextContent;

/// Values recovered by one extractor, plus bookkeeping about what was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    /// Accepted values, deduplicated and in the extractor's output order
    pub items: Vec<T>,
    /// Number of marker occurrences examined
    pub occurrences: usize,
    /// Occurrences that produced no value
    pub skipped: usize,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            occurrences: 0,
            skipped: 0,
        }
    }
}

impl<T> Extraction<T> {
    /// Returns the accepted values
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// A heuristic reader for one category of field
pub trait FieldExtractor: Send + Sync {
    /// The value recovered at a marker occurrence
    type Item: Ord;

    /// The marker this extractor anchors on
    fn marker(&self) -> &Marker;

    /// Reads the value belonging to the marker occurrence at `offset`.
    ///
    /// Any error returned here is treated as "no value at this occurrence".
    fn read_at(&self, data: &[u8], offset: usize) -> Result<Self::Item>;

    /// Runs the extractor over the whole buffer.
    ///
    /// The default collects values into a set, so the result is sorted and
    /// free of duplicates.
    fn extract(&self, data: &[u8]) -> Extraction<Self::Item> {
        let mut seen = BTreeSet::new();
        let tally = visit(self, data, |item| {
            seen.insert(item);
        });

        Extraction {
            items: seen.into_iter().collect(),
            ..tally
        }
    }
}

/// Feeds every successfully read value to `accept` and tallies the rest
pub(crate) fn visit<E, F>(extractor: &E, data: &[u8], mut accept: F) -> Extraction<E::Item>
where
    E: FieldExtractor + ?Sized,
    F: FnMut(E::Item),
{
    let marker = extractor.marker();
    let mut tally = Extraction::default();

    for offset in marker.occurrences(data) {
        tally.occurrences += 1;
        match extractor.read_at(data, offset) {
            Ok(item) => accept(item),
            Err(e) => {
                trace!("Skipping {} occurrence: {}", marker.name(), e);
                tally.skipped += 1;
            }
        }
    }

    debug!(
        "{} extractor: {} occurrence(s), {} skipped",
        marker.name(),
        tally.occurrences,
        tally.skipped
    );
    tally
}
