//! Core data structures for REM archive synchronization.
//!
//! Defines the discovered-station record and the statistics accumulated
//! over a run for the end-of-run summary.

use serde::{Deserialize, Serialize};

/// A weather station discovered on the portal index page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Stable numeric identifier, kept as text exactly as published
    pub id: String,

    /// Display name, free text (may need sanitization for file naming)
    pub name: String,

    /// Qualifier tag from the trailing parenthesis, e.g. `REM` or `SLA`
    pub tag: String,
}

impl Station {
    /// Label used in logs and the run summary
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}

/// Why a station was skipped during a run
#[derive(Debug, Clone)]
pub struct SkippedStation {
    pub label: String,
    pub reason: String,
}

/// Statistics accumulated over a whole run
#[derive(Debug, Default)]
pub struct RunStats {
    /// Stations (or dataset files) examined
    pub stations_processed: usize,

    /// Stations that gained at least one row
    pub stations_updated: usize,

    /// Data rows appended across all stations
    pub rows_added: u64,

    /// Stations skipped, with reasons, for the end-of-run summary
    pub skipped: Vec<SkippedStation>,
}

impl RunStats {
    /// Record a station-level failure without aborting the run
    pub fn record_skip(&mut self, label: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedStation {
            label: label.into(),
            reason: reason.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_label() {
        let station = Station {
            id: "27".to_string(),
            name: "Merlo".to_string(),
            tag: "REM".to_string(),
        };
        assert_eq!(station.label(), "27 - Merlo");
    }

    #[test]
    fn test_run_stats_records_skips() {
        let mut stats = RunStats::default();
        stats.record_skip("27 - Merlo", "no usable data");
        assert_eq!(stats.skipped.len(), 1);
        assert_eq!(stats.skipped[0].reason, "no usable data");
    }
}
