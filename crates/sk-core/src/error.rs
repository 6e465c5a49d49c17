//! Error types for skimmer

use thiserror::Error;

/// Skimmer error type.
///
/// Every variant here is fatal to the run: configuration mistakes, input
/// format mismatches, and I/O failures abort processing rather than being
/// recovered per row. Empty selection results are not errors and never
/// surface through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (bad final-state label, malformed role template,
    /// unknown identification tier)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A row lacks an expected named attribute. Indicates an input-format
    /// mismatch affecting the whole sample, so it aborts the run.
    #[error("Missing branch '{branch}' in final state '{final_state}'")]
    MissingBranch {
        /// Attribute name that was requested.
        branch: String,
        /// Final state whose row block lacked it.
        final_state: String,
    },

    /// Output schema violation (materialized record does not match the
    /// table schema built at configuration time)
    #[error("Schema error: {0}")]
    Schema(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
