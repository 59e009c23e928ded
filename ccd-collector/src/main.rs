//! County data collector (ccd-collector) - Main entry point
//!
//! Collects county-level population, income, disaster, unemployment and
//! health indicators from public government APIs and writes one combined
//! table.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ccd_collector::census_export::{export_fips_codes, resolve_variables, write_export, CensusExporter};
use ccd_collector::logging;
use ccd_collector::sources::CensusClient;
use ccd_collector::{finish, RunDriver, Sources};
use ccd_common::config::{is_valid_key, CollectorConfig};
use ccd_common::lookup::CountyLookup;
use ccd_common::table::{read_table, write_rows};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SAMPLE_ROWS: usize = 5;

/// Command-line arguments for ccd-collector
#[derive(Parser, Debug)]
#[command(name = "ccd-collector")]
#[command(about = "County-level public data collector")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "CCD_CONFIG")]
    config: Option<PathBuf>,

    /// Census API key (overrides environment and config file)
    #[arg(long, global = true)]
    census_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect and merge all sources for the configured states
    Collect {
        /// Comma-separated state postal codes (e.g. CA,IL,TX)
        #[arg(short, long, value_delimiter = ',')]
        states: Option<Vec<String>>,

        /// Combined table output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a FIPS-keyed JSON lookup blob
        #[arg(short, long)]
        lookup: Option<PathBuf>,
    },

    /// Build the JSON lookup blob from an existing combined table
    Lookup {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Download raw Census variables for every county in the country
    CensusExport {
        /// "ALL" for the preset catalog, or comma-separated variable codes
        #[arg(short, long, default_value = "ALL")]
        variables: String,

        #[arg(short, long, default_value = "census_data_export.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before config loading so its messages are visible;
    // RUST_LOG wins over the configured level
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, log_level) = logging::reloadable_filter(rust_log.as_deref());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config =
        CollectorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(key) = args.census_key.as_deref().filter(|k| is_valid_key(k)) {
        config.census.api_key = Some(key.to_string());
    }
    if let Err(e) = log_level.apply_configured(&config.logging.level) {
        warn!("{:#}; keeping startup log level", e);
    }

    info!("Starting ccd-collector v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Collect { states, output, lookup } => {
            let states: Vec<String> = states
                .unwrap_or_else(|| config.run.states.clone())
                .iter()
                .map(|s| s.trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            let output = output.unwrap_or_else(|| config.run.output.clone());
            let lookup = lookup.or_else(|| config.run.lookup.clone());
            collect(&config, &states, &output, lookup.as_deref()).await
        }
        Command::Lookup { input, output } => build_lookup(&input, &output),
        Command::CensusExport { variables, output } => {
            census_export(&config, &variables, &output).await
        }
    }
}

async fn collect(
    config: &CollectorConfig,
    states: &[String],
    output: &Path,
    lookup: Option<&Path>,
) -> Result<()> {
    if config.census.api_key.is_none() {
        warn!("No Census API key configured; requests may be throttled");
    }
    if !is_valid_key(&config.bls.registration_key) {
        warn!("No BLS registration key configured; unemployment requests may be rejected");
    }

    info!(states = %states.join(","), "Collecting county data");

    let sources = Sources::from_config(config).context("Failed to initialize source adapters")?;
    let driver = RunDriver::new(config, sources);
    let summary = driver.run(states).await;

    for (postal, reason) in &summary.skipped {
        warn!(state = %postal, ?reason, "State skipped");
    }

    let saved = finish(&summary, output, lookup).context("Failed to save combined table")?;

    let sample = &summary.rows[..summary.rows.len().min(SAMPLE_ROWS)];
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "\nSample of combined data:")?;
    write_rows(&mut stdout, sample)?;
    writeln!(stdout, "\nSaved {} county rows to {}", saved, output.display())?;
    Ok(())
}

fn build_lookup(input: &Path, output: &Path) -> Result<()> {
    let rows = read_table(input)
        .with_context(|| format!("Failed to read combined table {}", input.display()))?;
    let blob = CountyLookup::from_rows(&rows);
    blob.write_json(output)
        .with_context(|| format!("Failed to write lookup {}", output.display()))?;

    info!(counties = blob.len(), path = %output.display(), "Lookup written");
    println!("Saved {} counties to {}", blob.len(), output.display());
    Ok(())
}

async fn census_export(config: &CollectorConfig, variables: &str, output: &Path) -> Result<()> {
    let variables = resolve_variables(variables).context("Invalid variable selection")?;
    let client = CensusClient::new(config.census.clone(), &config.http)
        .context("Failed to initialize Census client")?;

    let fips = export_fips_codes();
    info!(variables = %variables.join(","), states = fips.len(), "Starting Census export");

    let table = CensusExporter::new(&client).export(&variables, &fips).await;
    if !table.failed.is_empty() {
        warn!(failed = %table.failed.join(","), "Some states could not be exported");
    }

    let saved = write_export(&table, output).context("Failed to save Census export")?;
    println!("Saved {} county rows to {}", saved, output.display());
    Ok(())
}
