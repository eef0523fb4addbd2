//! Error types for unflat library.

use std::io;
use thiserror::Error;

/// Result type alias for unflat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can surface from document reconstruction.
///
/// Only broken collaborator contracts are reported here. Recoverable
/// situations (an unanchored heading, a skeleton the greedy matcher cannot
/// align) degrade to a best-effort result and are logged instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Page or tree JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bounding box was supplied with fewer than four coordinates.
    #[error("Invalid bounding box: expected 4 coordinates, got {len}")]
    InvalidBoundingBox { len: usize },

    /// A table-model output carries far more cell fragments than its skeleton has slots.
    #[error(
        "Table on page {page} has {fragments} cell fragments for {placeholders} skeleton placeholders"
    )]
    TableCellMismatch {
        page: u32,
        placeholders: usize,
        fragments: usize,
    },

    /// A role label that is not part of the role vocabulary.
    #[error("Unknown role label: {0}")]
    UnknownRole(String),

    /// Error during rendering (Markdown, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidBoundingBox { len: 3 };
        assert_eq!(
            err.to_string(),
            "Invalid bounding box: expected 4 coordinates, got 3"
        );

        let err = Error::TableCellMismatch {
            page: 2,
            placeholders: 4,
            fragments: 11,
        };
        assert_eq!(
            err.to_string(),
            "Table on page 2 has 11 cell fragments for 4 skeleton placeholders"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
