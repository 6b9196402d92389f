//! Scanner configuration from environment variables
//!
//! Binaries call `dotenv::dotenv().ok()` first, so a `.env` file next to the
//! working directory is honoured.

use crate::error::Result;
use crate::scoring::noise::{LargeCapUniverse, NoiseFilterConfig};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/tracker.db";
pub const DEFAULT_BENCHMARK_INDEX: &str = "NIFTY 500";
pub const DEFAULT_LARGE_CAP_PATH: &str = "data/large_caps.json";

/// Runtime configuration for the scoring binaries
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Path to the SQLite database file
    pub db_path: String,

    /// Benchmark used for price detachment
    pub benchmark_index: String,

    /// Large-cap reference set (JSON)
    pub large_cap_path: PathBuf,

    /// True when `large_cap_path` came from the environment
    pub large_cap_path_explicit: bool,

    /// Calendar days of history loaded per run
    pub lookback_days: i64,

    /// Rows in the end-of-run report
    pub top_n: usize,

    pub noise: NoiseFilterConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            benchmark_index: DEFAULT_BENCHMARK_INDEX.to_string(),
            large_cap_path: PathBuf::from(DEFAULT_LARGE_CAP_PATH),
            large_cap_path_explicit: false,
            lookback_days: 120,
            top_n: 10,
            noise: NoiseFilterConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PUMPSCAN_DB_PATH` (default: data/tracker.db)
    /// - `PUMPSCAN_BENCHMARK_INDEX` (default: NIFTY 500)
    /// - `PUMPSCAN_LARGE_CAP_PATH` (default: data/large_caps.json)
    /// - `PUMPSCAN_LOOKBACK_DAYS` (default: 120)
    /// - `PUMPSCAN_TOP_N` (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let large_cap_override = env::var("PUMPSCAN_LARGE_CAP_PATH").ok();

        Self {
            db_path: env::var("PUMPSCAN_DB_PATH").unwrap_or(defaults.db_path),

            benchmark_index: env::var("PUMPSCAN_BENCHMARK_INDEX")
                .unwrap_or(defaults.benchmark_index),

            large_cap_path_explicit: large_cap_override.is_some(),
            large_cap_path: large_cap_override
                .map(PathBuf::from)
                .unwrap_or(defaults.large_cap_path),

            lookback_days: env::var("PUMPSCAN_LOOKBACK_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|d: &i64| *d > 0)
                .unwrap_or(defaults.lookback_days),

            top_n: env::var("PUMPSCAN_TOP_N")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.top_n),

            noise: defaults.noise,
        }
    }

    /// Load the large-cap reference set
    ///
    /// An explicitly configured path must be readable. The default path is
    /// optional: when absent the universe is empty and a warning is logged.
    pub fn load_large_caps(&self) -> Result<LargeCapUniverse> {
        if !self.large_cap_path_explicit && !self.large_cap_path.exists() {
            log::warn!(
                "⚠️  Large-cap set not found at {}, no symbols will be excluded as large caps",
                self.large_cap_path.display()
            );
            return Ok(LargeCapUniverse::default());
        }
        LargeCapUniverse::load(&self.large_cap_path)
    }
}
