//! HTTP transport with retry and backoff.
//!
//! All portal traffic goes through [`Transport::fetch`], which retries
//! transient failures with exponential backoff before surfacing a single
//! typed error. A non-2xx status and a transport-level failure are treated
//! identically for retry purposes: the portal offers no useful distinction
//! between the two. Timing comes from [`SyncConfig`], so tests run with
//! millisecond delays.

use crate::config::SyncConfig;
use crate::constants::{CSV_ENDPOINT, USER_AGENT};
use crate::error::{RemError, Result};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

/// Portal HTTP client wrapper
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_factor: f64,
    rate_limit: Duration,
}

impl Transport {
    /// Build a transport from the run configuration
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
            backoff_factor: config.backoff_factor,
            rate_limit: config.rate_limit,
        })
    }

    /// CSV endpoint URL for one station and date range (dates as `YYYYMMDD`)
    pub fn csv_url(&self, station_id: &str, from: NaiveDate, to: NaiveDate) -> String {
        format!(
            "{}{}?tipo=Periodo&Estacion={}&fechaDesde={}&fechahasta={}",
            self.base_url,
            CSV_ENDPOINT,
            station_id,
            from.format("%Y%m%d"),
            to.format("%Y%m%d"),
        )
    }

    /// Absolute URL for a portal page path
    pub fn page_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a URL, retrying with exponential backoff.
    ///
    /// Only the final attempt's failure is surfaced, as one
    /// [`RemError::FetchFailed`] carrying the station and URL.
    pub async fn fetch(&self, station: &str, url: &str) -> Result<Vec<u8>> {
        let mut delay = self.backoff_base;
        let mut last_cause = String::new();

        for attempt in 1..=self.max_attempts {
            match self.try_fetch(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(cause) => {
                    debug!(
                        "attempt {}/{} failed for {}: {}",
                        attempt, self.max_attempts, url, cause
                    );
                    last_cause = cause;
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay = delay.mul_f64(self.backoff_factor);
                    }
                }
            }
        }

        Err(RemError::FetchFailed {
            station: station.to_string(),
            url: url.to_string(),
            cause: last_cause,
        })
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }

    /// Courtesy pause between consecutive requests
    pub async fn pace(&self) {
        if !self.rate_limit.is_zero() {
            tokio::time::sleep(self.rate_limit).await;
        }
    }
}
