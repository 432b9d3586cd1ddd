//! Error types for csvstream

use crate::types::Position;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CsvError>;

/// Errors produced while configuring, decoding, tokenizing or assembling CSV
#[derive(Debug, Error)]
pub enum CsvError {
    /// Invalid parser or decoder configuration (e.g. delimiter equal to quotation)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The byte input could not be decoded with the configured charset
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A data row does not have as many fields as the header
    #[error("row {row}: expected {expected} fields, got {actual}")]
    RowShape {
        /// 1-based index of the data row (the header is not counted)
        row: u64,
        /// Header length
        expected: usize,
        /// Number of fields found in the row
        actual: usize,
    },

    /// An input source was rejected before producing any chunk
    #[error("source validation error: {0}")]
    SourceValidation(String),

    /// Quoting error raised only in strict quote mode
    #[error("malformed quoted field at {position}: {message}")]
    MalformedQuote {
        /// Where the offending character (or end of input) was found
        position: Position,
        /// What went wrong
        message: String,
    },

    /// A single field grew past `ParseOptions::max_field_bytes`
    #[error("field at {position} exceeds the limit of {limit} bytes")]
    FieldTooLarge {
        /// Position of the character that crossed the limit
        position: Position,
        /// Configured limit
        limit: usize,
    },

    /// Failure reading input
    #[error("read error: {0}")]
    ReadError(String),

    /// Failure writing output
    #[error("write error: {0}")]
    WriteError(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CsvError {
    /// True for errors describing the shape of the data rather than the input itself
    pub fn is_row_shape(&self) -> bool {
        matches!(self, CsvError::RowShape { .. })
    }
}
