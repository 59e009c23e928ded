//! ccd-collector library interface
//!
//! Exposes the source adapters, merge engine and run driver for the binary
//! and for integration tests.

pub mod batch;
pub mod census_export;
pub mod driver;
pub mod logging;
pub mod merge;
pub mod sources;

pub use driver::{finish, RunDriver, RunSummary, SkipReason, Sources};
pub use sources::{CountySource, SourceError, SourceOutcome};
