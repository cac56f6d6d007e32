//! Client configuration loaded from the process environment.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use pickup_runtime::RuntimeConfig;

/// Settings for one headless demo session.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// RON file with a [`RuntimeConfig`]; defaults are used when unset.
    pub runtime_config: Option<PathBuf>,
    /// Directory of `*.ifl` rule files; built-in sample rules when unset.
    pub rules_dir: Option<PathBuf>,
    pub tick_interval: Option<Duration>,
    /// How many ticks the demo runs before printing the final status.
    pub ticks: u64,
    /// Directory for a rolling log file in addition to stderr.
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub const DEFAULT_TICKS: u64 = 60;

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `PICKUP_CONFIG` - RON runtime config file (default: built-in defaults)
    /// - `PICKUP_RULES_DIR` - rule directory; sample rules are written to it when empty
    /// - `PICKUP_TICK_MS` - tick period in milliseconds (overrides the config file)
    /// - `PICKUP_TICKS` - number of ticks to run (default: 60)
    /// - `PICKUP_LOG_DIR` - also write logs to `pickup.log` in this directory
    pub fn from_env() -> Self {
        Self {
            runtime_config: env::var_os("PICKUP_CONFIG").map(PathBuf::from),
            rules_dir: env::var_os("PICKUP_RULES_DIR").map(PathBuf::from),
            tick_interval: read_env::<u64>("PICKUP_TICK_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            ticks: read_env::<u64>("PICKUP_TICKS").unwrap_or(Self::DEFAULT_TICKS),
            log_dir: env::var_os("PICKUP_LOG_DIR").map(PathBuf::from),
        }
    }

    /// Runtime config from the file (or defaults) with env overrides applied.
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.runtime_config {
            Some(path) => RuntimeConfig::load_from_file(path)
                .with_context(|| format!("loading runtime config from {}", path.display()))?,
            None => RuntimeConfig {
                priority_query: Some("rarity == Unique".into()),
                ..RuntimeConfig::default()
            },
        };
        if let Some(interval) = self.tick_interval {
            config.tick_interval = interval;
        }
        Ok(config)
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!(key, value = %value, "ignoring unparsable environment value");
                None
            }
        },
        Err(_) => None,
    }
}
