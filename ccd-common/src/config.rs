//! Configuration for the county data collector
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`CCD_CENSUS_API_KEY`, `CCD_BLS_REGISTRATION_KEY`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! Every section and field is optional in the TOML file. The resulting
//! [`CollectorConfig`] is handed to each source adapter at construction, so
//! tests can point adapters at fake endpoints.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CENSUS_KEY_ENV: &str = "CCD_CENSUS_API_KEY";
pub const BLS_KEY_ENV: &str = "CCD_BLS_REGISTRATION_KEY";

/// Complete collector configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CollectorConfig {
    pub run: RunConfig,
    pub http: HttpConfig,
    pub census: CensusConfig,
    pub fema: FemaConfig,
    pub bls: BlsConfig,
    pub places: PlacesConfig,
    pub logging: LoggingConfig,
}

/// Run driver settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Ordered list of state postal codes to process
    pub states: Vec<String>,
    /// Politeness pause between regions
    pub region_delay_ms: u64,
    /// Combined table output path
    pub output: PathBuf,
    /// Optional FIPS lookup JSON for the map UI
    pub lookup: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            states: vec!["CA".to_string(), "IL".to_string(), "TX".to_string()],
            region_delay_ms: 1000,
            output: PathBuf::from("combined_county_data.csv"),
            lookup: None,
        }
    }
}

impl RunConfig {
    pub fn region_delay(&self) -> Duration {
        Duration::from_millis(self.region_delay_ms)
    }
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("ccd-collector/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Census ACS (population/income) source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    pub base_url: String,
    pub year: u16,
    pub dataset: String,
    pub api_key: Option<String>,
    /// Pause between per-state requests of the raw variable export
    pub export_delay_ms: u64,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.census.gov/data".to_string(),
            year: 2021,
            dataset: "acs/acs5".to_string(),
            api_key: None,
            export_delay_ms: 500,
        }
    }
}

impl CensusConfig {
    /// `{base_url}/{year}/{dataset}`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.year,
            self.dataset.trim_matches('/')
        )
    }

    pub fn export_delay(&self) -> Duration {
        Duration::from_millis(self.export_delay_ms)
    }
}

/// FEMA disaster declarations source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FemaConfig {
    pub base_url: String,
    /// Server-side result cap
    pub top: u32,
}

impl Default for FemaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.fema.gov/api/open/v2/DisasterDeclarationsSummaries".to_string(),
            top: 10_000,
        }
    }
}

/// BLS LAUS time series source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlsConfig {
    pub base_url: String,
    pub start_year: u16,
    pub end_year: u16,
    pub registration_key: String,
    /// Series per request; the API rejects oversized requests
    pub batch_size: usize,
    /// Fixed pause between batches
    pub batch_delay_ms: u64,
}

impl Default for BlsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bls.gov/publicAPI/v2/timeseries/data/".to_string(),
            start_year: 2023,
            end_year: 2023,
            registration_key: String::new(),
            batch_size: 20,
            batch_delay_ms: 1000,
        }
    }
}

impl BlsConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// CDC PLACES health survey source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    /// Server-side result cap
    pub limit: u32,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.cdc.gov/resource/swc5-untb.json".to_string(),
            limit: 5000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins if set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CollectorConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from an explicit file; the file must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration: explicit path, else the default location,
    /// else built-in defaults; then apply environment overrides
    ///
    /// A missing default file only logs a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    info!("Loading configuration from {}", path.display());
                    Self::from_file(&path)?
                }
                _ => {
                    warn!("No configuration file found, using built-in defaults");
                    Self::default()
                }
            },
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay API keys from the environment (blank values are ignored)
    pub fn apply_env(&mut self) {
        if let Some(key) = env_key(CENSUS_KEY_ENV) {
            info!("Census API key loaded from environment variable");
            self.census.api_key = Some(key);
        }
        if let Some(key) = env_key(BLS_KEY_ENV) {
            info!("BLS registration key loaded from environment variable");
            self.bls.registration_key = key;
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|k| is_valid_key(k))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// `<config_dir>/ccd/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ccd").join("config.toml"))
}
