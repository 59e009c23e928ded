//! Run driver
//!
//! Processes the configured states one at a time. Within a state the base
//! source runs first (its FIPS list feeds the BLS batches), then the
//! disaster, unemployment and health sources, strictly in sequence. Merged
//! rows go into an append-only accumulator that is written once at the end.

use crate::batch::Pacer;
use crate::merge::{merge_region, MergeStats};
use crate::sources::{
    BlsClient, CensusClient, CountySource, FemaClient, PlacesClient, RegionQuery, SourceError,
    SourceOutcome,
};
use ccd_common::config::CollectorConfig;
use ccd_common::lookup::CountyLookup;
use ccd_common::models::{CountyRecord, DisasterCount, HealthMeasure, MergedRow, UnemploymentRate};
use ccd_common::table::write_table;
use ccd_common::{Error, Region, Result};
use std::path::Path;
use tracing::{error, info, warn};

/// The four adapters a run draws from
pub struct Sources {
    pub census: Box<dyn CountySource<Row = CountyRecord>>,
    pub fema: Box<dyn CountySource<Row = DisasterCount>>,
    pub bls: Box<dyn CountySource<Row = UnemploymentRate>>,
    pub places: Box<dyn CountySource<Row = HealthMeasure>>,
}

impl Sources {
    /// Build the HTTP adapters from configuration
    pub fn from_config(config: &CollectorConfig) -> std::result::Result<Self, SourceError> {
        Ok(Self {
            census: Box::new(CensusClient::new(config.census.clone(), &config.http)?),
            fema: Box::new(FemaClient::new(config.fema.clone(), &config.http)?),
            bls: Box::new(BlsClient::new(config.bls.clone(), &config.http)?),
            places: Box::new(PlacesClient::new(config.places.clone(), &config.http)?),
        })
    }
}

/// Why a configured state produced no rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Postal code not in the state table
    UnknownRegion,
    /// Base source errored
    BaseSourceFailed(String),
    /// Base source answered with zero counties
    BaseSourceEmpty,
}

/// Per-state row counts, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    pub postal: String,
    pub census: usize,
    pub fema: usize,
    pub bls: usize,
    pub places: usize,
    pub stats: MergeStats,
}

/// Everything a run collected
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Accumulated merged rows, in processing order
    pub rows: Vec<MergedRow>,
    pub processed: Vec<RegionReport>,
    pub skipped: Vec<(String, SkipReason)>,
}

pub struct RunDriver {
    sources: Sources,
    region_pacer: Pacer,
}

impl RunDriver {
    pub fn new(config: &CollectorConfig, sources: Sources) -> Self {
        Self {
            sources,
            region_pacer: Pacer::new(config.run.region_delay()),
        }
    }

    /// Pauses taken between regions so far
    pub fn region_pauses(&self) -> usize {
        self.region_pacer.pauses()
    }

    /// Run every configured state in order
    ///
    /// Never fails: unknown or unavailable states are logged and recorded
    /// in [`RunSummary::skipped`].
    pub async fn run(&self, states: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut requested = false;

        for postal in states {
            let region = match Region::from_postal(postal) {
                Ok(region) => region,
                Err(e) => {
                    warn!(state = %postal, error = %e, "Skipping state: invalid state code");
                    summary.skipped.push((postal.clone(), SkipReason::UnknownRegion));
                    continue;
                }
            };

            if requested {
                self.region_pacer.pause().await;
            }
            requested = true;

            info!(state = %region.postal, fips = %region.fips, "Processing state");
            match self.process_region(&region).await {
                Ok((rows, report)) => {
                    summary.rows.extend(rows);
                    summary.processed.push(report);
                }
                Err(reason) => summary.skipped.push((region.postal.clone(), reason)),
            }
        }

        info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            rows = summary.rows.len(),
            "Run complete"
        );
        summary
    }

    async fn process_region(
        &self,
        region: &Region,
    ) -> std::result::Result<(Vec<MergedRow>, RegionReport), SkipReason> {
        let base = match self.sources.census.fetch(RegionQuery::new(region)).await {
            SourceOutcome::Data(rows) => rows,
            SourceOutcome::Empty => {
                warn!(state = %region.postal, "Skipping state: base source returned no counties");
                return Err(SkipReason::BaseSourceEmpty);
            }
            SourceOutcome::Failed(e) => {
                warn!(state = %region.postal, error = %e, "Skipping state: base source fetch failed");
                return Err(SkipReason::BaseSourceFailed(e.to_string()));
            }
        };
        info!(state = %region.postal, counties = base.len(), "Census");

        let fips_keys: Vec<String> = base.iter().map(|r| r.fips_key.clone()).collect();

        let disasters = self.sources.fema.fetch(RegionQuery::new(region)).await;
        info!(state = %region.postal, records = disasters.len(), status = disasters.status(), "FEMA");

        info!(state = %region.postal, series = fips_keys.len(), "BLS: fetching unemployment in batches");
        let unemployment = self
            .sources
            .bls
            .fetch(RegionQuery::with_fips_keys(region, &fips_keys))
            .await;
        info!(state = %region.postal, records = unemployment.len(), status = unemployment.status(), "BLS");

        let health = self.sources.places.fetch(RegionQuery::new(region)).await;
        info!(state = %region.postal, records = health.len(), status = health.status(), "CDC PLACES");

        let merged = match merge_region(
            region,
            &base,
            disasters.rows(),
            unemployment.rows(),
            health.rows(),
        ) {
            Ok(merged) => merged,
            Err(e) => {
                error!(state = %region.postal, error = %e, "Merge failed");
                return Err(SkipReason::BaseSourceEmpty);
            }
        };

        let report = RegionReport {
            postal: region.postal.clone(),
            census: base.len(),
            fema: disasters.len(),
            bls: unemployment.len(),
            places: health.len(),
            stats: merged.stats,
        };
        Ok((merged.rows, report))
    }
}

/// Write the accumulated table (and optional lookup blob) once
///
/// Returns the number of rows written. With nothing collected, nothing is
/// written and [`Error::NoDataCollected`] is returned.
pub fn finish(summary: &RunSummary, output: &Path, lookup: Option<&Path>) -> Result<usize> {
    if summary.rows.is_empty() {
        warn!("No data collected; output not written");
        return Err(Error::NoDataCollected);
    }

    write_table(output, &summary.rows)?;
    info!(rows = summary.rows.len(), path = %output.display(), "Combined table written");

    if let Some(path) = lookup {
        let blob = CountyLookup::from_rows(&summary.rows);
        blob.write_json(path)?;
        info!(counties = blob.len(), path = %path.display(), "Lookup blob written");
    }

    Ok(summary.rows.len())
}
