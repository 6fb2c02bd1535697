//! Custom error types for the embed-reader crate.

use thiserror::Error;

/// The primary error type for all load operations in this crate.
///
/// Every variant is detected during loading and returned to the caller;
/// none are retried internally. Lookup itself never fails structurally:
/// an absent word is reported as `None`, not as an error.
#[derive(Debug, Error)]
pub enum LoadError {
    /// An error originating from I/O operations, including failed mappings.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes were available than the format declared it needs.
    #[error("Truncated input while reading {context}: needed {needed}, found {available}")]
    TruncatedInput {
        context: &'static str,
        needed: u64,
        available: u64,
    },

    /// Magic/version mismatch, or a structural field outside its legal range.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// A row's float count disagrees with the declared dimensionality.
    #[error("Dimension mismatch for {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// The file does not match the format the caller requested, or an
    /// operation (such as memory mapping) is not available for it.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A word appears more than once in the source file.
    #[error("Duplicate vocabulary entry: {word:?}")]
    DuplicateWord { word: String },
}

/// A convenience `Result` type alias using the crate's `LoadError` type.
pub type Result<T> = std::result::Result<T, LoadError>;
