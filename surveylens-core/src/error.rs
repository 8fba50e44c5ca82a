//! Error types for surveylens-core

use thiserror::Error;

/// Main error type for the surveylens-core library
///
/// Only I/O boundaries produce errors. The analytics functions themselves
/// fail closed on bad timestamps and never return one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (survey-result payloads)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The survey-result source rejected a request
    #[error("{source_name} source error: {message}")]
    Source {
        source_name: String,
        message: String,
    },
}

/// Result type alias for surveylens-core
pub type Result<T> = std::result::Result<T, Error>;
