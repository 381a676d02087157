//! Custom error types for nlfind
//!
//! Uses thiserror for ergonomic error definitions with automatic
//! Display and Error trait implementations.

use thiserror::Error;

/// Application-specific errors for nlfind
#[derive(Error, Debug)]
pub enum NlfindError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Search request failed validation before any work started
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Search was cancelled by the caller
    #[error("Search cancelled")]
    Cancelled,

    /// Prompt could not be turned into a structured query
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// Content extraction failed for a file
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// JSON parsing failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NlfindError>;
