//! Typed records for each upstream source and the merged output row
//!
//! Each adapter converts its payload into one of these shapes exactly once;
//! nothing downstream of an adapter handles untyped maps.

use serde::{Deserialize, Serialize};

/// Canonical column order of the combined table
pub const COLUMNS: [&str; 12] = [
    "fips_key",
    "state_abbr",
    "state_name",
    "county_name",
    "population",
    "median_income",
    "unemployment_rate",
    "disaster_count",
    "obesity_rate",
    "diabetes_rate",
    "smoking_rate",
    "binge_drinking_rate",
];

/// Census annotation values (e.g. `-666666666`) sit far below any real
/// estimate; anything at or under this threshold means "not available".
const SENTINEL_THRESHOLD: f64 = -100_000_000.0;

/// One county row from the population/income registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRecord {
    /// 5-digit state + county FIPS key
    pub fips_key: String,
    pub state_name: String,
    /// County name with the " County" suffix stripped
    pub county_name: String,
    pub population: u64,
    pub median_income: Option<f64>,
}

/// Disaster declarations observed for one normalized county name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasterCount {
    pub county_name: String,
    pub disaster_count: u64,
}

/// First observed unemployment rate (%) for one county series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnemploymentRate {
    pub fips_key: String,
    pub unemployment_rate: f64,
}

/// Health survey measures pivoted to one row per county
///
/// Measures missing for a present county are 0.0, not null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMeasure {
    pub fips_key: String,
    pub obesity_rate: f64,
    pub diabetes_rate: f64,
    pub smoking_rate: f64,
    pub binge_drinking_rate: f64,
}

impl HealthMeasure {
    /// Dense row with every measure at the zero sentinel
    pub fn zeroed(fips_key: impl Into<String>) -> Self {
        Self {
            fips_key: fips_key.into(),
            obesity_rate: 0.0,
            diabetes_rate: 0.0,
            smoking_rate: 0.0,
            binge_drinking_rate: 0.0,
        }
    }
}

/// Final denormalized row, one per base county
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub fips_key: String,
    pub state_abbr: String,
    pub state_name: String,
    pub county_name: String,
    pub population: u64,
    pub median_income: Option<f64>,
    pub unemployment_rate: Option<f64>,
    pub disaster_count: u64,
    pub obesity_rate: Option<f64>,
    pub diabetes_rate: Option<f64>,
    pub smoking_rate: Option<f64>,
    pub binge_drinking_rate: Option<f64>,
}

impl MergedRow {
    /// Start a row from a base record with every secondary column empty
    pub fn from_base(base: &CountyRecord, state_abbr: &str) -> Self {
        Self {
            fips_key: base.fips_key.clone(),
            state_abbr: state_abbr.to_string(),
            state_name: base.state_name.clone(),
            county_name: base.county_name.clone(),
            population: base.population,
            median_income: base.median_income,
            unemployment_rate: None,
            disaster_count: 0,
            obesity_rate: None,
            diabetes_rate: None,
            smoking_rate: None,
            binge_drinking_rate: None,
        }
    }

    /// Cell text for a canonical column, empty for nulls
    pub fn cell(&self, column: &str) -> Option<String> {
        let opt = |v: Option<f64>| v.map(format_number).unwrap_or_default();
        let value = match column {
            "fips_key" => self.fips_key.clone(),
            "state_abbr" => self.state_abbr.clone(),
            "state_name" => self.state_name.clone(),
            "county_name" => self.county_name.clone(),
            "population" => self.population.to_string(),
            "median_income" => opt(self.median_income),
            "unemployment_rate" => opt(self.unemployment_rate),
            "disaster_count" => self.disaster_count.to_string(),
            "obesity_rate" => opt(self.obesity_rate),
            "diabetes_rate" => opt(self.diabetes_rate),
            "smoking_rate" => opt(self.smoking_rate),
            "binge_drinking_rate" => opt(self.binge_drinking_rate),
            _ => return None,
        };
        Some(value)
    }
}

/// Render a float without a trailing ".0" for whole numbers
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Parse a numeric cell, treating blanks, junk and sentinels as absent
pub fn coerce_measure(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value <= SENTINEL_THRESHOLD {
        return None;
    }
    Some(value)
}

/// Parse a count cell; anything unusable becomes 0
pub fn coerce_count(raw: &str) -> u64 {
    match coerce_measure(raw) {
        Some(v) if v > 0.0 => v as u64,
        _ => 0,
    }
}
