//! Tracing setup for the binary
//!
//! The subscriber has to exist before configuration is loaded so that
//! config-loading messages are visible, but the configured log level is
//! only known afterwards. The filter therefore starts at `RUST_LOG` (or
//! `info`) and is swapped for the configured level once the file is read.

use anyhow::{Context, Result};
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Level used until configuration is loaded
pub const STARTUP_LEVEL: &str = "info";

/// Handle for swapping in the configured level
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Startup filter layer plus its reload handle
///
/// `rust_log` is the value of `RUST_LOG`; when it parses, it wins for the
/// whole run.
pub fn reloadable_filter(rust_log: Option<&str>) -> (reload::Layer<EnvFilter, Registry>, LogLevel) {
    let env_filter = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok());
    let from_env = env_filter.is_some();
    let (layer, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL)));
    (layer, LogLevel { handle, from_env })
}

impl LogLevel {
    /// Switch to the configured level unless `RUST_LOG` set one
    ///
    /// Returns whether the filter changed.
    pub fn apply_configured(&self, level: &str) -> Result<bool> {
        if self.from_env {
            return Ok(false);
        }
        let filter = EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{}'", level))?;
        self.handle
            .reload(filter)
            .context("Failed to apply configured log level")?;
        Ok(true)
    }
}
