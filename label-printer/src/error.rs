//! Error types for the label engine

use thiserror::Error;

use crate::symbology::Symbology;

/// Barcode encoding error
///
/// Raised before any layout or print work starts, so no partial output exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Nothing to encode
    #[error("Barcode content is empty")]
    Empty,

    /// Character outside the symbology's alphabet
    #[error("Unsupported character {ch:?} at position {position} for {symbology}")]
    UnsupportedCharacter {
        ch: char,
        position: usize,
        symbology: Symbology,
    },
}

/// Printer transport error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error (nothing was written)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while writing to an open connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid printer address or configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

/// Any failure of a single label job
#[derive(Debug, Error)]
pub enum LabelError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("Preview output failed: {0}")]
    Preview(String),
}

pub type LabelResult<T> = Result<T, LabelError>;
