//! Common error types for the county data collector

use thiserror::Error;

/// Common result type for collector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a region or a run
///
/// Upstream transport failures are not represented here: adapters absorb
/// them into an empty outcome and never propagate them.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error for the lookup blob
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Postal code missing from the static state table
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// Base (population/income) source produced no rows for a region
    #[error("Base source returned no rows for {0}")]
    BaseSourceEmpty(String),

    /// No region was processed successfully; nothing to write
    #[error("No data collected")]
    NoDataCollected,

    /// Malformed delimited table input
    #[error("Table error at line {line}: {message}")]
    Table { line: usize, message: String },
}
