//! Error Taxonomy
//!
//! A single crate-wide error type. Internal layers return typed variants;
//! the HTTP boundary translates variants to status codes. Upstream provider
//! failures only surface here after the retry budget is exhausted.

/// Crate-wide error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request was malformed before any processing (wrong file type, bad payload)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload is HTML but no known chat export format was detected
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Input parsed cleanly but contained nothing to process
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Not enough data for the requested computation (projection needs M >= 2)
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Vector dimension disagrees with the corpus-wide dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// External provider failed after exhausting retries
    #[error("Upstream provider failed: {0}")]
    Upstream(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error was caused by an external provider (maps to 502)
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }
}
