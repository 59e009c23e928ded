//! FIPS-keyed lookup blob for the map UI
//!
//! The map pages embed this JSON and read county attributes from it on
//! hover/click. It is read-only from the UI's side.

use crate::models::MergedRow;
use crate::table::ensure_parent;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Ordered `fips_key -> row` map
#[derive(Debug, Clone, Default)]
pub struct CountyLookup {
    counties: BTreeMap<String, MergedRow>,
}

#[derive(Serialize)]
struct LookupDocument<'a> {
    generated_at: DateTime<Utc>,
    counties: &'a BTreeMap<String, MergedRow>,
}

impl CountyLookup {
    /// Build from merged rows; the first row wins on a repeated key
    pub fn from_rows(rows: &[MergedRow]) -> Self {
        let mut counties = BTreeMap::new();
        for row in rows {
            if counties.contains_key(&row.fips_key) {
                warn!(fips = %row.fips_key, "Duplicate fips_key in lookup input, keeping first row");
                continue;
            }
            counties.insert(row.fips_key.clone(), row.clone());
        }
        Self { counties }
    }

    pub fn get(&self, fips_key: &str) -> Option<&MergedRow> {
        self.counties.get(fips_key)
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }

    /// Serialize as `{ "generated_at": ..., "counties": { fips: row } }`
    pub fn to_json(&self) -> Result<String> {
        let doc = LookupDocument {
            generated_at: Utc::now(),
            counties: &self.counties,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Write the JSON document to `path`
    pub fn write_json(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(self.to_json()?.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}
