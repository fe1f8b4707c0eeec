//! Error types for the affex-core library.
//!
//! Two tiers live in the same enum. Fatal errors (I/O, the external
//! utility, serialization) end a run. Recoverable errors describe why a
//! single marker occurrence did not yield a value; extractors count and
//! skip them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for affex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all affex operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The extraction command template could not be used
    #[error("invalid extractor command template '{template}': {details}")]
    InvalidTemplate {
        /// The offending template
        template: String,
        /// What is wrong with it
        details: String,
    },

    /// The external extraction utility could not be started
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The external extraction utility did not finish in time
    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout {
        /// Program that was invoked
        program: String,
        /// The timeout that expired
        timeout: Duration,
    },

    /// No decompressed document stream was produced for the input
    #[error("no decompressed document stream found for '{path}'")]
    StreamNotFound {
        /// The input file
        path: PathBuf,
    },

    /// Failed to serialize the report
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A fixed-width field ran past the end of the buffer
    #[error("truncated field at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        /// Offset where the field starts
        offset: usize,
        /// Bytes required
        needed: usize,
        /// Bytes remaining
        available: usize,
    },

    /// A length prefix outside the accepted range
    #[error("length {length} at offset {offset} is out of range")]
    LengthOutOfRange {
        /// Offset of the length field
        offset: usize,
        /// The decoded length
        length: u32,
    },

    /// Element dimensions outside the accepted range
    #[error("element {width}x{height} at offset {offset} is out of range")]
    DimensionOutOfRange {
        /// Offset of the marker
        offset: usize,
        /// Rounded width
        width: f64,
        /// Rounded height
        height: f64,
    },

    /// A coordinate was NaN or infinite
    #[error("non-finite coordinate at offset {offset}")]
    NonFinite {
        /// Offset of the marker
        offset: usize,
    },

    /// Nothing usable was found next to the marker
    #[error("empty value at offset {offset}")]
    EmptyValue {
        /// Offset of the marker
        offset: usize,
    },

    /// A decoded value too short to be meaningful
    #[error("value '{value}' at offset {offset} is too short")]
    TooShort {
        /// Offset of the marker
        offset: usize,
        /// The rejected value
        value: String,
    },

    /// Text matched a localization boilerplate token
    #[error("text at offset {offset} matches denylisted token '{token}'")]
    Denylisted {
        /// Offset of the marker
        offset: usize,
        /// The token that matched
        token: &'static str,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new template error
    pub fn invalid_template(template: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            details: details.into(),
        }
    }

    /// Creates a new spawn error
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a new stream-not-found error
    pub fn stream_not_found(path: impl Into<PathBuf>) -> Self {
        Self::StreamNotFound { path: path.into() }
    }

    /// Creates a new truncated field error
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::Truncated {
            offset,
            needed,
            available,
        }
    }

    /// Returns true if this error only affects a single marker occurrence
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::LengthOutOfRange { .. }
                | Self::DimensionOutOfRange { .. }
                | Self::NonFinite { .. }
                | Self::EmptyValue { .. }
                | Self::TooShort { .. }
                | Self::Denylisted { .. }
        )
    }
}
