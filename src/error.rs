//! Error types for facegaze

use thiserror::Error;

/// Errors that can abort the analysis of one participant
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed log: {0}")]
    MalformedLog(String),

    #[error("Missing anchor event: {0}")]
    MissingAnchor(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
