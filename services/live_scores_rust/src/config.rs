//! Configuration for live_scores_rust

use anyhow::{anyhow, Result};
use cricscore_rust_core::clients::DEFAULT_LIVE_SCORES_URL;
use cricscore_rust_core::normalizer::NormalizerConfig;
use cricscore_rust_core::pipeline::CycleConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveScoresConfig {
    // Source page
    pub scrape_url: String,
    pub source_timeout_secs: u64,
    pub source_cb_failure_threshold: u32,
    pub source_cb_recovery_timeout_secs: u64,

    // Scheduling
    pub poll_interval_secs: u64,
    pub cycle_deadline_secs: u64,
    pub fragment_timeout_secs: u64,
    pub max_concurrent_fragments: usize,

    // Prediction service
    pub prediction_url: String,
    pub prediction_timeout_secs: u64,
    pub prediction_cb_failure_threshold: u32,
    pub prediction_cb_recovery_timeout_secs: u64,

    // Redis
    pub redis_url: String,

    // Storage
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,

    // Lookup table extensions
    pub stadium_mappings_path: Option<PathBuf>,
    pub team_mappings_path: Option<PathBuf>,

    // Normalizer
    pub require_toss: bool,
    pub strict_format: bool,
}

impl LiveScoresConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let store_backend: StoreBackend = vars
            .string("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;
        let database_url = vars.string("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORE_BACKEND=postgres"));
        }

        let poll_interval_secs = vars.parse_u64("POLL_INTERVAL_SECS", 30)?;
        let cycle_deadline_secs = vars.parse_u64("CYCLE_DEADLINE_SECS", 25)?;
        let fragment_timeout_secs = vars.parse_u64("FRAGMENT_TIMEOUT_SECS", 10)?;
        let max_concurrent_fragments = vars.parse_u64("MAX_CONCURRENT_FRAGMENTS", 4)? as usize;

        if poll_interval_secs == 0 {
            return Err(anyhow!("POLL_INTERVAL_SECS must be > 0"));
        }
        if cycle_deadline_secs == 0 || cycle_deadline_secs > poll_interval_secs {
            return Err(anyhow!(
                "CYCLE_DEADLINE_SECS must be > 0 and <= POLL_INTERVAL_SECS"
            ));
        }
        if fragment_timeout_secs == 0 {
            return Err(anyhow!("FRAGMENT_TIMEOUT_SECS must be > 0"));
        }
        if max_concurrent_fragments == 0 {
            return Err(anyhow!("MAX_CONCURRENT_FRAGMENTS must be > 0"));
        }

        Ok(Self {
            scrape_url: vars
                .string("SCRAPE_URL")
                .unwrap_or_else(|| DEFAULT_LIVE_SCORES_URL.to_string()),
            source_timeout_secs: vars.parse_u64("SOURCE_TIMEOUT_SECS", 15)?,
            source_cb_failure_threshold: vars.parse_u32("SOURCE_CB_FAILURE_THRESHOLD", 5)?,
            source_cb_recovery_timeout_secs: vars.parse_u64("SOURCE_CB_RECOVERY_TIMEOUT_SECS", 30)?,

            poll_interval_secs,
            cycle_deadline_secs,
            fragment_timeout_secs,
            max_concurrent_fragments,

            prediction_url: vars
                .string("PREDICTION_URL")
                .unwrap_or_else(|| "http://localhost:5000".to_string()),
            prediction_timeout_secs: vars.parse_u64("PREDICTION_TIMEOUT_SECS", 5)?,
            prediction_cb_failure_threshold: vars.parse_u32("PREDICTION_CB_FAILURE_THRESHOLD", 3)?,
            prediction_cb_recovery_timeout_secs: vars
                .parse_u64("PREDICTION_CB_RECOVERY_TIMEOUT_SECS", 60)?,

            redis_url: vars
                .string("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),

            store_backend,
            database_url,

            stadium_mappings_path: vars.string("STADIUM_MAPPINGS_PATH").map(PathBuf::from),
            team_mappings_path: vars.string("TEAM_MAPPINGS_PATH").map(PathBuf::from),

            require_toss: vars.parse_bool("REQUIRE_TOSS", true)?,
            strict_format: vars.parse_bool("STRICT_FORMAT", false)?,
        })
    }

    pub fn cycle_config(&self) -> CycleConfig {
        CycleConfig {
            deadline: Duration::from_secs(self.cycle_deadline_secs),
            fragment_timeout: Duration::from_secs(self.fragment_timeout_secs),
            max_concurrency: self.max_concurrent_fragments,
        }
    }

    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            require_toss: self.require_toss,
            strict_format: self.strict_format,
        }
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Set and non-blank
    fn string(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u32(&self, var: &str, default: u32) -> Result<u32> {
        match self.string(var) {
            Some(val) => val.parse().map_err(|_| anyhow!("{} must be a valid u32", var)),
            None => Ok(default),
        }
    }

    fn parse_u64(&self, var: &str, default: u64) -> Result<u64> {
        match self.string(var) {
            Some(val) => val.parse().map_err(|_| anyhow!("{} must be a valid u64", var)),
            None => Ok(default),
        }
    }

    fn parse_bool(&self, var: &str, default: bool) -> Result<bool> {
        match self.string(var) {
            Some(val) => match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(anyhow!("{} must be true or false", var)),
            },
            None => Ok(default),
        }
    }
}
