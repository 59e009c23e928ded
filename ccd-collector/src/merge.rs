//! Merge engine
//!
//! Left-joins the secondary sources onto the base (population/income)
//! table for one region. Joins only add columns: the output has exactly one
//! row per base record, in base order.
//!
//! Join keys:
//! - disasters: normalized county name (the registry has no FIPS)
//! - unemployment, health: `fips_key`

use ccd_common::models::{CountyRecord, DisasterCount, HealthMeasure, MergedRow, UnemploymentRate};
use ccd_common::{Error, Region, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Join hit/miss counts for one region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub base_rows: usize,
    /// Base rows that found a disaster count by name
    pub disaster_matched: usize,
    /// Disaster names that matched no base county
    pub disaster_unmatched_names: usize,
    pub unemployment_matched: usize,
    pub health_matched: usize,
}

impl MergeStats {
    /// Base rows left without a disaster match (defaulted to 0)
    pub fn disaster_unmatched_rows(&self) -> usize {
        self.base_rows - self.disaster_matched
    }
}

/// Merged rows for one region plus join statistics
#[derive(Debug, Clone)]
pub struct RegionMerge {
    pub rows: Vec<MergedRow>,
    pub stats: MergeStats,
}

/// First record per key wins
fn index_by<'a, T>(rows: &'a [T], key: impl Fn(&T) -> &str) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(key(row)).or_insert(row);
    }
    index
}

/// Merge one region's source outputs onto its base table
///
/// Fails with [`Error::BaseSourceEmpty`] when there is nothing to merge
/// onto. Disaster counts default to 0 and unemployment stays null on a
/// miss. When the health set is empty for the whole region, all four health
/// columns are null; otherwise unmatched counties also stay null.
pub fn merge_region(
    region: &Region,
    base: &[CountyRecord],
    disasters: &[DisasterCount],
    unemployment: &[UnemploymentRate],
    health: &[HealthMeasure],
) -> Result<RegionMerge> {
    if base.is_empty() {
        return Err(Error::BaseSourceEmpty(region.postal.clone()));
    }

    let mut stats = MergeStats {
        base_rows: base.len(),
        ..Default::default()
    };

    let disaster_index = index_by(disasters, |d| d.county_name.as_str());
    let unemployment_index = index_by(unemployment, |u| u.fips_key.as_str());
    let health_index = index_by(health, |h| h.fips_key.as_str());

    let mut rows = Vec::with_capacity(base.len());
    for record in base {
        let mut row = MergedRow::from_base(record, &region.postal);

        if let Some(d) = disaster_index.get(record.county_name.as_str()) {
            row.disaster_count = d.disaster_count;
            stats.disaster_matched += 1;
        }

        if let Some(u) = unemployment_index.get(record.fips_key.as_str()) {
            row.unemployment_rate = Some(u.unemployment_rate);
            stats.unemployment_matched += 1;
        }

        if let Some(h) = health_index.get(record.fips_key.as_str()) {
            row.obesity_rate = Some(h.obesity_rate);
            row.diabetes_rate = Some(h.diabetes_rate);
            row.smoking_rate = Some(h.smoking_rate);
            row.binge_drinking_rate = Some(h.binge_drinking_rate);
            stats.health_matched += 1;
        }

        rows.push(row);
    }

    let base_names: HashSet<&str> = base.iter().map(|r| r.county_name.as_str()).collect();
    stats.disaster_unmatched_names = disaster_index
        .keys()
        .filter(|name| !base_names.contains(*name))
        .count();

    if !disasters.is_empty() && stats.disaster_unmatched_names > 0 {
        warn!(
            state = %region.postal,
            unmatched_names = stats.disaster_unmatched_names,
            unmatched_counties = stats.disaster_unmatched_rows(),
            "Disaster names without a county match"
        );
    }
    debug!(state = %region.postal, ?stats, "Region merged");

    Ok(RegionMerge { rows, stats })
}
