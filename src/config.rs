//! Configuration for synchronization runs.
//!
//! All retry, backoff, and pacing behavior is carried in an explicit
//! [`SyncConfig`] value handed to the components at construction, so tests
//! can inject deterministic timing instead of relying on ambient globals.

use crate::constants::{
    DEFAULT_BACKFILL_START_YEAR, DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_FACTOR, DEFAULT_DATA_DIR,
    DEFAULT_FALLBACK_LOOKBACK_DAYS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, PORTAL_BASE_URL,
};
use crate::error::{RemError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for a synchronization run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the climate portal
    pub base_url: String,

    /// Directory holding one CSV dataset per station
    pub data_dir: PathBuf,

    /// Attempts per request before surfacing a fetch failure
    pub max_attempts: u32,

    /// Initial backoff delay after a failed attempt
    pub backoff_base: Duration,

    /// Multiplier applied to the backoff delay after each failed attempt
    pub backoff_factor: f64,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Courtesy pause between consecutive requests
    pub rate_limit: Duration,

    /// First year fetched by a historical backfill
    pub backfill_start_year: i32,

    /// Lookback window when a dataset file exists but holds no data rows
    pub fallback_lookback_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: PORTAL_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            backfill_start_year: DEFAULT_BACKFILL_START_YEAR,
            fallback_lookback_days: DEFAULT_FALLBACK_LOOKBACK_DAYS,
        }
    }
}

impl SyncConfig {
    /// Override the portal base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-station dataset directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Override the attempt count per request
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the initial backoff delay
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Override the inter-request pause
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Override the first backfill year
    pub fn with_backfill_start_year(mut self, year: i32) -> Self {
        self.backfill_start_year = year;
        self
    }

    /// Override the empty-dataset lookback window
    pub fn with_fallback_lookback_days(mut self, days: i64) -> Self {
        self.fallback_lookback_days = days;
        self
    }

    /// Validate configuration invariants before a run
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(RemError::Configuration {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        if self.backoff_factor < 1.0 {
            return Err(RemError::Configuration {
                message: format!(
                    "backoff_factor must not shrink the delay (got {})",
                    self.backoff_factor
                ),
            });
        }
        if self.fallback_lookback_days < 0 {
            return Err(RemError::Configuration {
                message: format!(
                    "fallback_lookback_days must not be negative (got {})",
                    self.fallback_lookback_days
                ),
            });
        }
        Ok(())
    }
}
