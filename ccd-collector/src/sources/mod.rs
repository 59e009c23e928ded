//! Upstream source adapters
//!
//! One adapter per government data service. Each builds its request from
//! the [`CollectorConfig`](ccd_common::config::CollectorConfig) it was
//! constructed with, decodes the payload into typed records, and reports
//! the result as a [`SourceOutcome`]. Transport and decoding failures stop
//! at the adapter boundary; they are logged and never returned as errors.

use async_trait::async_trait;
use ccd_common::config::HttpConfig;
use ccd_common::Region;
use thiserror::Error;

pub mod bls;
pub mod census;
pub mod fema;
pub mod places;

pub use bls::BlsClient;
pub use census::CensusClient;
pub use fema::FemaClient;
pub use places::PlacesClient;

/// Why a source produced nothing usable
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Resource not found")]
    NotFound,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The service answered but reported a non-success status in its body
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// Result of one adapter call
///
/// Distinguishes "the service had nothing" from "the service failed" while
/// still letting callers treat both as an empty row set.
#[derive(Debug)]
pub enum SourceOutcome<T> {
    Data(Vec<T>),
    Empty,
    Failed(SourceError),
}

impl<T> SourceOutcome<T> {
    /// `Data` for a non-empty vector, `Empty` otherwise
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            SourceOutcome::Empty
        } else {
            SourceOutcome::Data(rows)
        }
    }

    pub fn rows(&self) -> &[T] {
        match self {
            SourceOutcome::Data(rows) => rows,
            _ => &[],
        }
    }

    pub fn into_rows(self) -> Vec<T> {
        match self {
            SourceOutcome::Data(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed(_))
    }

    /// Short label for logs
    pub fn status(&self) -> &'static str {
        match self {
            SourceOutcome::Data(_) => "ok",
            SourceOutcome::Empty => "empty",
            SourceOutcome::Failed(_) => "failed",
        }
    }
}

impl<T> From<Result<Vec<T>, SourceError>> for SourceOutcome<T> {
    fn from(result: Result<Vec<T>, SourceError>) -> Self {
        match result {
            Ok(rows) => SourceOutcome::from_rows(rows),
            Err(SourceError::NotFound) => SourceOutcome::Empty,
            Err(e) => SourceOutcome::Failed(e),
        }
    }
}

/// Inputs an adapter may need for one region
#[derive(Debug, Clone, Copy)]
pub struct RegionQuery<'a> {
    pub region: &'a Region,
    /// FIPS keys of the base table, in base order (empty for the base call)
    pub fips_keys: &'a [String],
}

impl<'a> RegionQuery<'a> {
    pub fn new(region: &'a Region) -> Self {
        Self {
            region,
            fips_keys: &[],
        }
    }

    pub fn with_fips_keys(region: &'a Region, fips_keys: &'a [String]) -> Self {
        Self { region, fips_keys }
    }
}

/// County-level source adapter
#[async_trait]
pub trait CountySource: Send + Sync {
    /// Typed record this source produces
    type Row: Send;

    /// Source identifier for logs (e.g., "census", "fema")
    fn source_id(&self) -> &'static str;

    /// Fetch this source's rows for one region
    ///
    /// Never fails: problems are reported as `Empty` or `Failed`.
    async fn fetch(&self, query: RegionQuery<'_>) -> SourceOutcome<Self::Row>;
}

/// Build the HTTP client shared by all adapters
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .build()
        .map_err(|e| SourceError::Network(e.to_string()))
}

/// Log an outcome at the adapter boundary
pub(crate) fn log_outcome<T>(source: &str, region: &Region, outcome: &SourceOutcome<T>) {
    match outcome {
        SourceOutcome::Data(rows) => {
            tracing::debug!(source, state = %region.postal, rows = rows.len(), "Source returned data")
        }
        SourceOutcome::Empty => {
            tracing::debug!(source, state = %region.postal, "Source returned no rows")
        }
        SourceOutcome::Failed(e) => {
            tracing::warn!(source, state = %region.postal, error = %e, "Source unavailable")
        }
    }
}
