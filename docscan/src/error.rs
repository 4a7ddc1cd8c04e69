//! Error types for the docscan schema scanner.
//!
//! Errors are split by how far they propagate. [`ScanError`] is what a caller of
//! [`Scanner::scan`](crate::scanner::Scanner::scan) can observe: connectivity and
//! configuration problems abort the scan before any unit is attempted.
//! [`SourceError`] is produced by [`DocumentSource`](crate::sources::DocumentSource)
//! implementations; the scanner absorbs it per database or collection and records
//! it in the [`ScanSummary`](crate::types::ScanSummary) instead of failing.

use thiserror::Error;

/// The main error type for docscan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The document source could not be reached at all.
    #[error("Connectivity error: {message}")]
    Connectivity {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid scan options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization of a scan result.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A type alias for `Result<T, ScanError>`.
pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    /// Creates a connectivity error wrapping the error that caused it.
    pub fn connectivity_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Connectivity {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true if the error aborted a scan before any unit was attempted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Configuration(_))
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScanError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ScanError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised by a document source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The backend is unreachable.
    #[error("Source unreachable: {message}")]
    Unreachable { message: String },

    /// A single source operation failed.
    #[error("{operation} failed: {message}")]
    Operation { operation: String, message: String },

    /// The scan deadline passed before the operation completed.
    #[error("{operation} exceeded the scan deadline")]
    DeadlineExceeded { operation: String },

    /// The scan was cancelled while the operation was in flight.
    #[error("{operation} was cancelled")]
    Cancelled { operation: String },
}

/// Result type for document source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

impl SourceError {
    /// Creates an operation failure.
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an unreachable-backend error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Returns true if the error came from the scan deadline or cancellation
    /// rather than from the backend.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::DeadlineExceeded { .. } | Self::Cancelled { .. }
        )
    }
}
