//! OpenFEMA disaster declarations client
//!
//! The registry has no county FIPS field, only a free-text designated area
//! such as `"Los Angeles (County)"`. Counts are keyed by the normalized name
//! and joined onto the base table by name later.

use super::{http_client, log_outcome, CountySource, RegionQuery, SourceError, SourceOutcome};
use async_trait::async_trait;
use ccd_common::config::{FemaConfig, HttpConfig};
use ccd_common::identifiers::normalize_county_name;
use ccd_common::models::DisasterCount;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FemaResponse {
    #[serde(rename = "DisasterDeclarationsSummaries", default)]
    summaries: Vec<FemaDeclaration>,
}

#[derive(Debug, Deserialize)]
struct FemaDeclaration {
    #[serde(rename = "designatedArea")]
    designated_area: Option<String>,
}

/// FEMA API client
pub struct FemaClient {
    http_client: reqwest::Client,
    config: FemaConfig,
}

impl FemaClient {
    pub fn new(config: FemaConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(http)?,
            config,
        })
    }

    async fn fetch_counts(&self, postal: &str) -> Result<Vec<DisasterCount>, SourceError> {
        let filter = format!("state eq '{}'", postal);
        let top = self.config.top.to_string();
        let params = [
            ("$filter", filter.as_str()),
            ("$select", "designatedArea"),
            ("$top", top.as_str()),
        ];

        debug!(state = %postal, "Querying FEMA API");

        let response = self
            .http_client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == 404 {
            return Err(SourceError::NotFound);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: FemaResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(count_by_area(
            body.summaries.iter().filter_map(|d| d.designated_area.as_deref()),
        ))
    }
}

/// Group designated areas by normalized name, sorted by name
pub fn count_by_area<'a>(areas: impl IntoIterator<Item = &'a str>) -> Vec<DisasterCount> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for area in areas {
        *counts.entry(normalize_county_name(area)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(county_name, disaster_count)| DisasterCount {
            county_name,
            disaster_count,
        })
        .collect()
}

#[async_trait]
impl CountySource for FemaClient {
    type Row = DisasterCount;

    fn source_id(&self) -> &'static str {
        "fema"
    }

    async fn fetch(&self, query: RegionQuery<'_>) -> SourceOutcome<DisasterCount> {
        let outcome: SourceOutcome<DisasterCount> =
            self.fetch_counts(&query.region.postal).await.into();
        log_outcome(self.source_id(), query.region, &outcome);
        outcome
    }
}
