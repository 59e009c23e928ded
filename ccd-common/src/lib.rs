//! # CCD Common Library
//!
//! Shared code for the county data collector including:
//! - Error type and result alias
//! - Configuration loading (TOML + environment overrides)
//! - Identifier normalization (state FIPS table, county name cleanup)
//! - Typed per-source records and the merged output row
//! - Delimited table reading/writing
//! - FIPS-keyed lookup blob consumed by the map UI

pub mod config;
pub mod error;
pub mod identifiers;
pub mod lookup;
pub mod models;
pub mod table;

pub use error::{Error, Result};
pub use identifiers::Region;
pub use models::{CountyRecord, DisasterCount, HealthMeasure, MergedRow, UnemploymentRate};
