//! CDC PLACES health survey client
//!
//! PLACES returns long-format records (one per county per measure). Four
//! measures are kept and pivoted into one dense [`HealthMeasure`] per county,
//! keyed by `locationid` (the county FIPS) so no name matching is needed.

use super::{http_client, log_outcome, CountySource, RegionQuery, SourceError, SourceOutcome};
use async_trait::async_trait;
use ccd_common::config::{HttpConfig, PlacesConfig};
use ccd_common::models::{coerce_measure, HealthMeasure};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Measure ID → output column
pub const TARGET_MEASURES: [(&str, &str); 4] = [
    ("CSMOKING", "smoking_rate"),
    ("OBESITY", "obesity_rate"),
    ("DIABETES", "diabetes_rate"),
    ("BINGE", "binge_drinking_rate"),
];

/// One long-format record, field names already lower-cased
#[derive(Debug, Clone, PartialEq)]
pub struct PlacesRecord {
    pub location_id: Option<String>,
    pub measure_id: Option<String>,
    pub data_value: Option<String>,
}

impl PlacesRecord {
    /// Read a record from a JSON object, ignoring field-name case
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut record = Self {
            location_id: None,
            measure_id: None,
            data_value: None,
        };
        for (key, value) in object {
            let text = match value {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            };
            match key.to_ascii_lowercase().as_str() {
                "locationid" => record.location_id = text,
                "measureid" => record.measure_id = text,
                "data_value" => record.data_value = text,
                _ => {}
            }
        }
        record
    }
}

#[derive(Default)]
struct PartialMeasures {
    values: [Option<f64>; 4],
}

/// Filter to the target measures and pivot to one row per county
///
/// The first parseable value for a (county, measure) pair wins. Target
/// measures never observed for a present county are filled with 0.0.
/// Output is ordered by `fips_key`.
pub fn pivot_measures(records: &[PlacesRecord]) -> Vec<HealthMeasure> {
    let mut by_fips: BTreeMap<String, PartialMeasures> = BTreeMap::new();

    for record in records {
        let (Some(fips), Some(measure)) = (&record.location_id, &record.measure_id) else {
            continue;
        };
        let Some(slot) = TARGET_MEASURES.iter().position(|(id, _)| *id == measure.as_str()) else {
            continue;
        };
        let entry = by_fips.entry(fips.clone()).or_default();
        if entry.values[slot].is_none() {
            entry.values[slot] = record.data_value.as_deref().and_then(coerce_measure);
        }
    }

    by_fips
        .into_iter()
        .map(|(fips_key, partial)| {
            let value = |slot: usize| partial.values[slot].unwrap_or(0.0);
            HealthMeasure {
                smoking_rate: value(0),
                obesity_rate: value(1),
                diabetes_rate: value(2),
                binge_drinking_rate: value(3),
                fips_key,
            }
        })
        .collect()
}

/// PLACES API client
pub struct PlacesClient {
    http_client: reqwest::Client,
    config: PlacesConfig,
}

impl PlacesClient {
    pub fn new(config: PlacesConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(http)?,
            config,
        })
    }

    async fn fetch_measures(&self, postal: &str) -> Result<Vec<HealthMeasure>, SourceError> {
        let limit = self.config.limit.to_string();
        let params = [("stateabbr", postal), ("$limit", limit.as_str())];

        debug!(state = %postal, "Querying CDC PLACES API");

        let response = self
            .http_client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: Vec<Map<String, Value>> = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let records: Vec<PlacesRecord> = body.iter().map(PlacesRecord::from_object).collect();
        if !records.is_empty() && records.iter().all(|r| r.location_id.is_none()) {
            warn!(state = %postal, "PLACES records have no locationid; health columns will be empty");
            return Ok(Vec::new());
        }

        Ok(pivot_measures(&records))
    }
}

#[async_trait]
impl CountySource for PlacesClient {
    type Row = HealthMeasure;

    fn source_id(&self) -> &'static str {
        "places"
    }

    async fn fetch(&self, query: RegionQuery<'_>) -> SourceOutcome<HealthMeasure> {
        let outcome: SourceOutcome<HealthMeasure> =
            self.fetch_measures(&query.region.postal).await.into();
        log_outcome(self.source_id(), query.region, &outcome);
        outcome
    }
}
