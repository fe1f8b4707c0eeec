//! Element bounding boxes following [`BOUNDS_MARKER`].

use super::{visit, Extraction, FieldExtractor};
use crate::error::{Error, Result};
use crate::scanner::{read_f64_le, Marker, BOUNDS_MARKER};
use crate::MAX_ELEMENT_DIMENSION;
use serde::Serialize;
use std::collections::HashSet;

/// Size and origin of one visual element, in whole document units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BoundingBox {
    /// Rounded `x2 - x1`
    pub width: i64,
    /// Rounded `y2 - y1`
    pub height: i64,
    /// Rounded `x1`
    pub x: i64,
    /// Rounded `y1`
    pub y: i64,
}

impl BoundingBox {
    /// Builds a box from raw corner coordinates.
    ///
    /// Rounding is half-to-even. Fails when any rounded value is not finite
    /// or either side is outside `(0, MAX_ELEMENT_DIMENSION)`.
    pub fn from_corners(offset: usize, [x1, y1, x2, y2]: [f64; 4]) -> Result<Self> {
        let width = (x2 - x1).round_ties_even();
        let height = (y2 - y1).round_ties_even();
        let (x, y) = (x1.round_ties_even(), y1.round_ties_even());

        if ![width, height, x, y].iter().all(|v| v.is_finite()) {
            return Err(Error::NonFinite { offset });
        }

        let limit = MAX_ELEMENT_DIMENSION as f64;
        if !(width > 0.0 && width < limit && height > 0.0 && height < limit) {
            return Err(Error::DimensionOutOfRange {
                offset,
                width,
                height,
            });
        }

        Ok(Self {
            width: width as i64,
            height: height as i64,
            x: x as i64,
            y: y as i64,
        })
    }

    /// Width times height
    pub fn area(&self) -> i64 {
        self.width * self.height
    }
}

/// Bounding box extractor
#[derive(Debug, Clone)]
pub struct BoundingBoxes {
    marker: Marker,
}

impl Default for BoundingBoxes {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBoxes {
    /// Creates a bounding box extractor anchored on [`BOUNDS_MARKER`]
    pub fn new() -> Self {
        Self::with_marker(BOUNDS_MARKER)
    }

    /// Creates a bounding box extractor anchored on a custom marker
    pub fn with_marker(marker: Marker) -> Self {
        Self { marker }
    }
}

impl FieldExtractor for BoundingBoxes {
    type Item = BoundingBox;

    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn read_at(&self, data: &[u8], offset: usize) -> Result<BoundingBox> {
        let corners = read_f64_le::<4>(data, offset + self.marker.len())?;
        BoundingBox::from_corners(offset, corners)
    }

    /// Keeps the first box seen for each distinct geometry, largest area first.
    ///
    /// Boxes with equal area stay in buffer order.
    fn extract(&self, data: &[u8]) -> Extraction<BoundingBox> {
        let mut seen = HashSet::new();
        let mut boxes = Vec::new();
        let tally = visit(self, data, |bbox| {
            if seen.insert(bbox) {
                boxes.push(bbox);
            }
        });

        boxes.sort_by_key(|bbox| std::cmp::Reverse(bbox.area()));
        Extraction {
            items: boxes,
            ..tally
        }
    }
}
