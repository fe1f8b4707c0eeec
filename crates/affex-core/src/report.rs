//! Assembling extractor output into a single report.
//!
//! The four field extractors only borrow the decompressed buffer, so they
//! run side by side on the rayon pool. Metadata comes from the raw file and
//! is looked up while the stream is being obtained.

use crate::error::{Error, Result};
use crate::extract::{
    BoundingBox, BoundingBoxes, Extraction, FieldExtractor, FontNames, LayerNames, TextContent,
};
use crate::metadata::locate_metadata;
use crate::stream::{RawStream, StreamSource};
use crate::MAX_REPORTED_ELEMENTS;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Everything recovered from one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Path or other identifier of the input
    pub source: String,
    /// JSON metadata found in the raw file, if any
    pub metadata: Option<Value>,
    /// Layer and group names, sorted
    pub layers: Vec<String>,
    /// Text content, sorted
    pub text_content: Vec<String>,
    /// Font family names, sorted
    pub fonts: Vec<String>,
    /// Largest element bounding boxes, by descending area
    pub element_sizes: Vec<BoundingBox>,
}

impl ExtractionReport {
    /// Serializes the report as indented JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Raw output of all four extractors over one buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    /// Layer names
    pub layers: Extraction<String>,
    /// Text content
    pub text_content: Extraction<String>,
    /// Font names
    pub fonts: Extraction<String>,
    /// All valid bounding boxes, before truncation
    pub element_sizes: Extraction<BoundingBox>,
}

/// Configuration for the extractor
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Run the field extractors concurrently
    pub parallel: bool,
    /// Number of bounding boxes kept in the report
    pub max_elements: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_elements: MAX_REPORTED_ELEMENTS,
        }
    }
}

impl ExtractorConfig {
    /// Creates a new extractor config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the field extractors run concurrently
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the number of bounding boxes kept in the report
    pub fn max_elements(mut self, max: usize) -> Self {
        self.max_elements = max;
        self
    }
}

/// Runs all field extractors and assembles reports
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
    layers: LayerNames,
    text: TextContent,
    fonts: FontNames,
    bounds: BoundingBoxes,
}

impl Extractor {
    /// Creates a new extractor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new extractor with custom configuration
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Runs the four field extractors over `data`
    pub fn extract_fields(&self, data: &[u8]) -> Fields {
        debug!("Extracting fields from {} bytes", data.len());

        let ((layers, text_content), (fonts, element_sizes)) = if self.config.parallel {
            rayon::join(
                || {
                    rayon::join(
                        || self.layers.extract(data),
                        || self.text.extract(data),
                    )
                },
                || {
                    rayon::join(
                        || self.fonts.extract(data),
                        || self.bounds.extract(data),
                    )
                },
            )
        } else {
            (
                (self.layers.extract(data), self.text.extract(data)),
                (self.fonts.extract(data), self.bounds.extract(data)),
            )
        };

        Fields {
            layers,
            text_content,
            fonts,
            element_sizes,
        }
    }

    /// Builds a report from a decompressed buffer and optional metadata
    pub fn assemble(
        &self,
        source: impl Into<String>,
        metadata: Option<Value>,
        data: &[u8],
    ) -> ExtractionReport {
        let fields = self.extract_fields(data);

        let mut element_sizes = fields.element_sizes.into_items();
        element_sizes.truncate(self.config.max_elements);

        let report = ExtractionReport {
            source: source.into(),
            metadata,
            layers: fields.layers.into_items(),
            text_content: fields.text_content.into_items(),
            fonts: fields.fonts.into_items(),
            element_sizes,
        };

        debug!(
            "Report: {} layer(s), {} text(s), {} font(s), {} element(s)",
            report.layers.len(),
            report.text_content.len(),
            report.fonts.len(),
            report.element_sizes.len()
        );
        report
    }

    /// Extracts a document, using `source` to obtain its decompressed stream
    pub fn extract_file(
        &self,
        path: impl AsRef<Path>,
        source: &dyn StreamSource,
    ) -> Result<ExtractionReport> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;

        let (metadata, stream) = rayon::join(|| locate_metadata(&raw), || source.obtain(path));
        let stream = stream?;

        Ok(self.assemble(path.display().to_string(), metadata, &stream))
    }

    /// Extracts from an already-decompressed stream; no metadata is available
    pub fn extract_stream_file(&self, path: impl AsRef<Path>) -> Result<ExtractionReport> {
        let path = path.as_ref();
        let stream = RawStream.obtain(path)?;
        Ok(self.assemble(path.display().to_string(), None, &stream))
    }
}

/// Extract a document with default configuration
///
/// This is a convenience function around [`Extractor::extract_file`].
pub fn extract_file(
    path: impl AsRef<Path>,
    source: &dyn StreamSource,
) -> Result<ExtractionReport> {
    Extractor::new().extract_file(path, source)
}

/// Extract an already-decompressed stream with default configuration
pub fn extract_stream_file(path: impl AsRef<Path>) -> Result<ExtractionReport> {
    Extractor::new().extract_stream_file(path)
}
