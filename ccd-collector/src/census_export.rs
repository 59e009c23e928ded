//! Raw Census variable export
//!
//! Downloads arbitrary ACS variables for every county in the country (all
//! states plus Puerto Rico) into one table, with variable codes replaced by
//! readable column names where the code is in [`PRESETS`].

use crate::batch::Pacer;
use crate::sources::CensusClient;
use ccd_common::identifiers::PUERTO_RICO_FIPS;
use ccd_common::table::write_raw_table;
use ccd_common::{Error, Region, Result};
use std::path::Path;
use tracing::{info, warn};

/// Commonly used ACS 5-year variables: (code, readable name)
pub const PRESETS: [(&str, &str); 13] = [
    ("B01003_001E", "Total Population"),
    ("B01002_001E", "Median Age"),
    ("B02001_002E", "White"),
    ("B02001_003E", "Black/African American"),
    ("B03003_003E", "Hispanic or Latino"),
    ("B02001_005E", "Asian"),
    ("B19013_001E", "Median Household Income"),
    ("B19301_001E", "Per Capita Income"),
    ("B17001_002E", "Persons in Poverty"),
    ("B23025_005E", "Unemployment Count"),
    ("B25001_001E", "Total Housing Units"),
    ("B25064_001E", "Median Gross Rent"),
    ("B25077_001E", "Median Home Value"),
];

/// Header for the `NAME` label column
pub const NAME_HEADER: &str = "County Name";

/// Readable name for `NAME` or a preset code
pub fn readable_name(code: &str) -> Option<&'static str> {
    if code == "NAME" {
        return Some(NAME_HEADER);
    }
    PRESETS
        .iter()
        .find(|(preset, _)| *preset == code)
        .map(|(_, name)| *name)
}

/// Parse a variable selection into the request list
///
/// `"ALL"` (any case) selects every preset; otherwise the input is a
/// comma-separated list of codes. `NAME` is always first and never
/// repeated.
pub fn resolve_variables(selection: &str) -> Result<Vec<String>> {
    let selection = selection.trim();
    let codes: Vec<String> = if selection.eq_ignore_ascii_case("all") {
        PRESETS.iter().map(|(code, _)| code.to_string()).collect()
    } else {
        selection
            .split(',')
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .collect()
    };

    if codes.is_empty() {
        return Err(Error::Config("no Census variables selected".to_string()));
    }

    let mut variables = vec!["NAME".to_string()];
    for code in codes {
        if !variables.contains(&code) {
            variables.push(code);
        }
    }
    Ok(variables)
}

/// Every state FIPS code plus Puerto Rico
pub fn export_fips_codes() -> Vec<String> {
    let mut codes: Vec<String> = Region::all().into_iter().map(|r| r.fips).collect();
    codes.push(PUERTO_RICO_FIPS.to_string());
    codes
}

/// Accumulated export table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// State FIPS codes whose request failed
    pub failed: Vec<String>,
}

/// Nationwide exporter built on the Census client
pub struct CensusExporter<'a> {
    client: &'a CensusClient,
    pacer: Pacer,
}

impl<'a> CensusExporter<'a> {
    pub fn new(client: &'a CensusClient) -> Self {
        Self {
            pacer: Pacer::new(client.config().export_delay()),
            client,
        }
    }

    /// Pauses taken between state requests so far
    pub fn pauses(&self) -> usize {
        self.pacer.pauses()
    }

    /// Request `variables` for each state in `state_fips`, in order
    ///
    /// Failed states are logged and skipped. The header is taken from the
    /// first successful response with `NAME` and preset codes renamed.
    pub async fn export(&self, variables: &[String], state_fips: &[String]) -> ExportTable {
        let vars: Vec<&str> = variables.iter().map(String::as_str).collect();
        let mut table = ExportTable::default();

        for (index, fips) in state_fips.iter().enumerate() {
            if index > 0 {
                self.pacer.pause().await;
            }

            match self.client.fetch_table(fips, &vars).await {
                Ok(chunk) => {
                    info!(state_fips = %fips, counties = chunk.rows.len(), "Census export: state fetched");
                    if table.header.is_empty() {
                        table.header = chunk
                            .header
                            .iter()
                            .map(|h| readable_name(h).map(str::to_string).unwrap_or_else(|| h.clone()))
                            .collect();
                    }
                    table.rows.extend(chunk.rows);
                }
                Err(e) => {
                    warn!(state_fips = %fips, error = %e, "Census export: skipping state");
                    table.failed.push(fips.clone());
                }
            }
        }

        table
    }
}

/// Write an export table, refusing to write an empty one
pub fn write_export(table: &ExportTable, output: &Path) -> Result<usize> {
    if table.rows.is_empty() {
        warn!("No Census data collected; export not written");
        return Err(Error::NoDataCollected);
    }
    write_raw_table(output, &table.header, &table.rows)?;
    info!(rows = table.rows.len(), path = %output.display(), "Census export written");
    Ok(table.rows.len())
}
