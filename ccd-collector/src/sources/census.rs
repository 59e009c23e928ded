//! Census ACS client (population and median household income)
//!
//! One GET per state for every county:
//! `{endpoint}?get=NAME,B01003_001E,B19013_001E&for=county:*&in=state:{fips}`.
//! The response is a JSON array of string arrays whose first row is the
//! header.

use super::{http_client, log_outcome, CountySource, RegionQuery, SourceError, SourceOutcome};
use async_trait::async_trait;
use ccd_common::config::{CensusConfig, HttpConfig};
use ccd_common::identifiers::{fips_key, split_combined_name};
use ccd_common::models::{coerce_count, coerce_measure, CountyRecord};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const POPULATION_VAR: &str = "B01003_001E";
pub const MEDIAN_INCOME_VAR: &str = "B19013_001E";

/// Raw header + rows table as returned by the Census API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CensusTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CensusTable {
    /// Decode the array-of-arrays payload
    ///
    /// Cells may be strings, numbers or null; everything becomes text
    /// (null as empty).
    pub fn from_json(value: serde_json::Value) -> Result<Self, SourceError> {
        let outer = match value {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(SourceError::Parse(format!(
                    "expected array of rows, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut lines = Vec::with_capacity(outer.len());
        for item in outer {
            let cells = match item {
                serde_json::Value::Array(cells) => cells,
                other => {
                    return Err(SourceError::Parse(format!(
                        "expected row array, got {}",
                        json_kind(&other)
                    )))
                }
            };
            lines.push(cells.into_iter().map(cell_text).collect::<Vec<_>>());
        }

        let mut lines = lines.into_iter();
        Ok(Self {
            header: lines.next().unwrap_or_default(),
            rows: lines.collect(),
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Census API client
pub struct CensusClient {
    http_client: reqwest::Client,
    config: CensusConfig,
}

impl CensusClient {
    pub fn new(config: CensusConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(http)?,
            config,
        })
    }

    pub fn config(&self) -> &CensusConfig {
        &self.config
    }

    /// Fetch `variables` for every county of one state
    ///
    /// The `state` and `county` geography columns come back after the
    /// requested variables.
    pub async fn fetch_table(
        &self,
        state_fips: &str,
        variables: &[&str],
    ) -> Result<CensusTable, SourceError> {
        let get = variables.join(",");
        let in_state = format!("state:{}", state_fips);
        let mut params: Vec<(&str, &str)> = vec![
            ("get", get.as_str()),
            ("for", "county:*"),
            ("in", in_state.as_str()),
        ];
        if let Some(key) = self.config.api_key.as_deref() {
            params.push(("key", key));
        }

        let url = self.config.endpoint();
        debug!(url = %url, state_fips = %state_fips, "Querying Census API");

        let response = self.http_client.get(&url).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        CensusTable::from_json(body)
    }

    async fn fetch_counties(&self, state_fips: &str) -> Result<Vec<CountyRecord>, SourceError> {
        let table = self
            .fetch_table(state_fips, &["NAME", POPULATION_VAR, MEDIAN_INCOME_VAR])
            .await?;
        parse_county_records(&table)
    }
}

/// Convert a Census table into base records
///
/// Population falls back to 0 and income to null when missing, non-numeric
/// or a Census sentinel. Repeated `fips_key` rows are dropped.
pub fn parse_county_records(table: &CensusTable) -> Result<Vec<CountyRecord>, SourceError> {
    if table.rows.is_empty() {
        return Ok(Vec::new());
    }

    let required = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| SourceError::Parse(format!("missing column {}", name)))
    };
    let name_col = required("NAME")?;
    let state_col = required("state")?;
    let county_col = required("county")?;
    let pop_col = table.column(POPULATION_VAR);
    let income_col = table.column(MEDIAN_INCOME_VAR);

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).map(String::as_str).unwrap_or("");

        let (state, county) = (cell(Some(state_col)).trim(), cell(Some(county_col)).trim());
        if state.is_empty() || county.is_empty() {
            warn!(name = %cell(Some(name_col)), "Census row without state/county codes, skipping");
            continue;
        }

        let key = fips_key(state, county);
        if !seen.insert(key.clone()) {
            warn!(fips = %key, "Duplicate county row from Census, keeping first");
            continue;
        }

        let (county_name, state_name) = split_combined_name(cell(Some(name_col)));
        records.push(CountyRecord {
            fips_key: key,
            state_name,
            county_name,
            population: coerce_count(cell(pop_col)),
            median_income: coerce_measure(cell(income_col)),
        });
    }

    Ok(records)
}

#[async_trait]
impl CountySource for CensusClient {
    type Row = CountyRecord;

    fn source_id(&self) -> &'static str {
        "census"
    }

    async fn fetch(&self, query: RegionQuery<'_>) -> SourceOutcome<CountyRecord> {
        let outcome: SourceOutcome<CountyRecord> =
            self.fetch_counties(&query.region.fips).await.into();
        log_outcome(self.source_id(), query.region, &outcome);
        outcome
    }
}
