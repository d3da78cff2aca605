//! Per-station synchronization driver.
//!
//! Orchestrates one station at a time: derive the missing range, plan its
//! calendar-month windows, then fetch, classify, and merge each window in
//! order. A failed window is logged and skipped - a single bad month never
//! aborts a station - and retrying happens only inside the transport, at
//! the single-request level.

use crate::config::SyncConfig;
use crate::dataset::{
    scan_coverage, station_file_name, station_id_from_filename, DatasetAppender, DatasetWriter,
};
use crate::discovery;
use crate::error::{RemError, Result};
use crate::models::Station;
use crate::payload::{classify, Payload};
use crate::transport::Transport;
use crate::windows::{month_windows, MonthWindow};
use chrono::{Duration, Local, NaiveDate};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Synchronization engine shared by the backfill and update commands
pub struct SyncEngine {
    transport: Transport,
    config: SyncConfig,
}

impl SyncEngine {
    /// Build an engine after validating the configuration
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(&config)?;
        Ok(Self { transport, config })
    }

    /// Discover the qualifying stations from the portal index page
    pub async fn discover_stations(&self) -> Result<Vec<Station>> {
        discovery::discover_stations(&self.transport).await
    }

    /// Fetch and classify one calendar-month window for a station
    async fn fetch_window(&self, station_id: &str, window: MonthWindow) -> Result<Payload> {
        let url = self
            .transport
            .csv_url(station_id, window.first_day(), window.last_day());
        let raw = self.transport.fetch(station_id, &url).await?;
        Ok(classify(&raw))
    }

    /// Download the full history of one station into a fresh dataset file.
    ///
    /// Returns the number of data rows written; a station that yields no
    /// rows across its whole planned range is an error, and its header-only
    /// stub is removed.
    pub async fn backfill_station(
        &self,
        station: &Station,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let path = self
            .config
            .data_dir
            .join(station_file_name(&station.id, &station.name));
        let start = NaiveDate::from_ymd_opt(self.config.backfill_start_year, 1, 1).ok_or_else(
            || RemError::Configuration {
                message: format!(
                    "invalid backfill start year {}",
                    self.config.backfill_start_year
                ),
            },
        )?;
        let today = today();

        debug!(
            "backfilling station {} from {}-01 into {}",
            station.id, self.config.backfill_start_year, path.display()
        );

        let mut writer = DatasetWriter::create(&path, &station.id)?;
        for window in month_windows(start, today) {
            if cancel.is_cancelled() {
                break;
            }
            match self.fetch_window(&station.id, window).await {
                Ok(Payload::Tabular(text)) => {
                    writer.write_window(&text)?;
                }
                Ok(Payload::Placeholder) => {
                    info!(
                        "HTML placeholder for station {} {} - skipped",
                        station.id, window
                    );
                }
                Ok(Payload::Empty) => {
                    debug!("no observations for station {} {}", station.id, window);
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
            self.transport.pace().await;
        }

        let rows = writer.finish()?;
        if rows == 0 {
            return Err(RemError::NoUsableData {
                station_id: station.id.clone(),
                name: station.name.clone(),
            });
        }
        Ok(rows)
    }

    /// Incrementally update one existing dataset file.
    ///
    /// The coverage boundary is re-derived from the file itself; a file
    /// that is already current returns zero rows without a single network
    /// call. Returns the number of rows appended.
    pub async fn update_station(&self, path: &Path, cancel: &CancellationToken) -> Result<u64> {
        let Some(station_id) = station_id_from_filename(path) else {
            warn!(
                "cannot infer a station id from file name: {}",
                path.display()
            );
            return Ok(0);
        };

        let coverage = scan_coverage(path)?;
        let today = today();
        let from = match coverage.last_timestamp {
            Some(last) => (last + Duration::days(1)).date(),
            None => {
                info!(
                    "dataset {} has no data rows, refilling the last {} days",
                    path.display(),
                    self.config.fallback_lookback_days
                );
                fallback_start(today, self.config.fallback_lookback_days)
            }
        };

        if from > today {
            debug!("station {} is already current", station_id);
            return Ok(0);
        }

        let mut appender = DatasetAppender::open(path, &coverage, &station_id)?;
        for window in month_windows(from, today) {
            if cancel.is_cancelled() {
                break;
            }
            match self.fetch_window(&station_id, window).await {
                Ok(Payload::Tabular(text)) => {
                    appender.append_window(&text)?;
                }
                Ok(Payload::Placeholder) => {
                    info!(
                        "HTML placeholder for station {} {} - skipped",
                        station_id, window
                    );
                }
                Ok(Payload::Empty) => {
                    debug!("no observations for station {} {}", station_id, window);
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
            self.transport.pace().await;
        }

        appender.finish()
    }
}

/// Today's date in local time
fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Conservative sync start for a dataset file with no derivable boundary
pub fn fallback_start(today: NaiveDate, lookback_days: i64) -> NaiveDate {
    today - Duration::days(lookback_days)
}
