//! BLS LAUS unemployment client
//!
//! The BLS time-series API is queried per series, not per state, so every
//! county gets its own series ID (`LAUCN{fips}0000000003`, the unemployment
//! rate series). IDs are sent in batches through the
//! [`BatchScheduler`](crate::batch::BatchScheduler); oversized requests are
//! rejected upstream.

use super::{http_client, log_outcome, CountySource, RegionQuery, SourceError, SourceOutcome};
use crate::batch::BatchScheduler;
use async_trait::async_trait;
use ccd_common::config::{BlsConfig, HttpConfig};
use ccd_common::models::UnemploymentRate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const SUCCESS_STATUS: &str = "REQUEST_SUCCEEDED";

/// Unemployment-rate series ID for a county
pub fn series_id(fips_key: &str) -> String {
    format!("LAUCN{}0000000003", fips_key)
}

#[derive(Debug, Serialize)]
struct BlsRequest<'a> {
    seriesid: &'a [String],
    startyear: String,
    endyear: String,
    registrationkey: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct BlsResponse {
    pub status: String,
    #[serde(default)]
    pub message: serde_json::Value,
    #[serde(rename = "Results")]
    pub results: Option<BlsResults>,
}

#[derive(Debug, Deserialize)]
pub struct BlsResults {
    #[serde(default)]
    pub series: Vec<BlsSeries>,
}

#[derive(Debug, Deserialize)]
pub struct BlsSeries {
    #[serde(rename = "seriesID")]
    pub series_id: String,
    #[serde(default)]
    pub data: Vec<BlsObservation>,
}

#[derive(Debug, Deserialize)]
pub struct BlsObservation {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub value: String,
}

impl BlsResponse {
    /// Human-readable form of the `message` field
    pub fn message_text(&self) -> String {
        match &self.message {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
            _ => "Unknown error".to_string(),
        }
    }
}

/// Per-region batch accounting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batches: usize,
    pub failed: usize,
    pub pauses: usize,
}

/// Extract the first observation of every known series
///
/// Series not present in `series_map` are ignored, as are empty series and
/// values that do not parse as numbers.
pub fn extract_rates(
    response: &BlsResponse,
    series_map: &HashMap<String, String>,
) -> Vec<UnemploymentRate> {
    let Some(results) = &response.results else {
        return Vec::new();
    };

    let mut rates = Vec::new();
    for series in &results.series {
        let Some(fips_key) = series_map.get(&series.series_id) else {
            debug!(series = %series.series_id, "Ignoring unrequested series");
            continue;
        };
        let Some(first) = series.data.first() else {
            continue;
        };
        match first.value.trim().parse::<f64>() {
            Ok(rate) => rates.push(UnemploymentRate {
                fips_key: fips_key.clone(),
                unemployment_rate: rate,
            }),
            Err(_) => debug!(
                series = %series.series_id,
                value = %first.value,
                year = %first.year,
                period = %first.period,
                "Skipping non-numeric observation"
            ),
        }
    }
    rates
}

/// BLS API client
pub struct BlsClient {
    http_client: reqwest::Client,
    config: BlsConfig,
}

impl BlsClient {
    pub fn new(config: BlsConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(http)?,
            config,
        })
    }

    async fn post_batch(&self, batch: &[String]) -> Result<BlsResponse, SourceError> {
        let payload = BlsRequest {
            seriesid: batch,
            startyear: self.config.start_year.to_string(),
            endyear: self.config.end_year.to_string(),
            registrationkey: &self.config.registration_key,
        };

        let response = self
            .http_client
            .post(&self.config.base_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: BlsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        if body.status != SUCCESS_STATUS {
            return Err(SourceError::Rejected(body.message_text()));
        }
        Ok(body)
    }

    /// Fetch rates for `fips_keys`, batching and pacing the requests
    ///
    /// A failed batch leaves its counties out of the result; it is neither
    /// retried nor fatal. Only when every batch fails is the whole call
    /// reported as failed.
    pub async fn fetch_rates(
        &self,
        fips_keys: &[String],
    ) -> (Result<Vec<UnemploymentRate>, SourceError>, BatchReport) {
        let series_map: HashMap<String, String> = fips_keys
            .iter()
            .map(|fips| (series_id(fips), fips.clone()))
            .collect();
        let series_ids: Vec<String> = fips_keys.iter().map(|fips| series_id(fips)).collect();

        let scheduler = BatchScheduler::new(self.config.batch_size, self.config.batch_delay());
        let results = scheduler
            .run(&series_ids, |index, batch| async move {
                let result = self.post_batch(batch).await;
                if let Err(e) = &result {
                    warn!(batch = index + 1, size = batch.len(), error = %e, "BLS batch warning");
                }
                result
            })
            .await;

        let mut report = BatchReport {
            batches: results.len(),
            failed: 0,
            pauses: scheduler.pacer().pauses(),
        };
        let mut rates = Vec::new();
        let mut last_error = None;

        for result in results {
            match result {
                Ok(body) => rates.extend(extract_rates(&body, &series_map)),
                Err(e) => {
                    report.failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if report.batches > 0 && report.failed == report.batches {
            if let Some(e) = last_error {
                return (Err(e), report);
            }
        }
        (Ok(rates), report)
    }
}

#[async_trait]
impl CountySource for BlsClient {
    type Row = UnemploymentRate;

    fn source_id(&self) -> &'static str {
        "bls"
    }

    async fn fetch(&self, query: RegionQuery<'_>) -> SourceOutcome<UnemploymentRate> {
        let (result, report) = self.fetch_rates(query.fips_keys).await;
        info!(
            state = %query.region.postal,
            batches = report.batches,
            failed = report.failed,
            "BLS batches complete"
        );
        let outcome: SourceOutcome<UnemploymentRate> = result.into();
        log_outcome(self.source_id(), query.region, &outcome);
        outcome
    }
}
