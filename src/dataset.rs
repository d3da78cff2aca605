//! Per-station dataset storage.
//!
//! Each station owns one flat CSV file: exactly one header line, then
//! append-only data rows. The file itself is the single source of truth
//! for sync state - coverage is re-derived by scanning its trailing
//! content at the start of every run, never from a side index.

use crate::constants::{EMPTY_STUB_MAX_BYTES, MAX_STATION_NAME_LEN};
use crate::error::Result;
use crate::rows::{row_timestamp, timestamp_column};
use chrono::NaiveDateTime;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

// =============================================================================
// File naming
// =============================================================================

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\-.áéíóúÁÉÍÓÚñÑ]").expect("valid regex"))
}

fn station_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)_").expect("valid regex"))
}

/// Make a station display name safe for use in a file name
pub fn sanitize_station_name(name: &str) -> String {
    let collapsed = whitespace_re().replace_all(name.trim(), "_");
    let cleaned = unsafe_chars_re().replace_all(&collapsed, "");
    cleaned.chars().take(MAX_STATION_NAME_LEN).collect()
}

/// Dataset file name for a station: `{id}_{sanitized_name}.csv`
pub fn station_file_name(id: &str, name: &str) -> String {
    format!("{}_{}.csv", id, sanitize_station_name(name))
}

/// Recover the numeric station id from a dataset file name
pub fn station_id_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let captures = station_id_re().captures(name)?;
    Some(captures[1].to_string())
}

// =============================================================================
// Coverage scan
// =============================================================================

/// Sync state derived from a dataset file's own content
#[derive(Debug, Clone)]
pub struct Coverage {
    /// Latest timestamp already durably stored, if any data rows exist
    pub last_timestamp: Option<NaiveDateTime>,

    /// The stored header line, authoritative for the life of the file
    pub header: String,
}

/// Scan a dataset file for its coverage boundary and header.
///
/// A full linear scan: the dataset is append-only and unindexed, so every
/// line after the header is attempted and the maximum successfully parsed
/// timestamp wins. Malformed stored rows are skipped silently - they
/// cannot be trusted to order subsequent merges. Invalid UTF-8 is read
/// lossily and never aborts the scan.
pub fn scan_coverage(path: &Path) -> Result<Coverage> {
    let raw = fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);

    let mut lines = text.lines();
    let header = lines
        .next()
        .unwrap_or("")
        .trim_end_matches('\r')
        .to_string();
    let column = timestamp_column(&header);

    let mut last_timestamp: Option<NaiveDateTime> = None;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(ts) = row_timestamp(line, column) {
            if last_timestamp.is_none_or(|prev| ts > prev) {
                last_timestamp = Some(ts);
            }
        }
    }

    Ok(Coverage {
        last_timestamp,
        header,
    })
}

// =============================================================================
// Merge writer (incremental)
// =============================================================================

/// Append-only merge writer for an existing station dataset.
///
/// Never rewrites or truncates existing content. Candidate rows are parsed
/// against the *stored* header's timestamp column; rows at or before the
/// coverage boundary are dropped, and unparsable rows are appended anyway.
/// That asymmetry with the strict coverage scan is the permissive-write
/// policy: losing an observation is judged worse than keeping a row that
/// cannot be ranked.
pub struct DatasetAppender {
    out: BufWriter<File>,
    header: String,
    column: usize,
    boundary: Option<NaiveDateTime>,
    rows_appended: u64,
    station: String,
}

impl DatasetAppender {
    /// Open a dataset in append mode with the coverage derived from it
    pub fn open(path: &Path, coverage: &Coverage, station: &str) -> Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            column: timestamp_column(&coverage.header),
            header: coverage.header.clone(),
            boundary: coverage.last_timestamp,
            rows_appended: 0,
            station: station.to_string(),
        })
    }

    /// Merge one fetched window; returns the number of rows appended.
    ///
    /// A fetched header differing from the stored one is a revision hazard:
    /// it is warned about and dropped, and data rows keep flowing under the
    /// original header contract.
    pub fn append_window(&mut self, window_text: &str) -> Result<u64> {
        let mut lines = window_text.lines();
        let Some(fetched_header) = lines.next() else {
            return Ok(0);
        };
        let fetched_header = fetched_header.trim_end_matches('\r');
        if !self.header.is_empty() && fetched_header != self.header {
            warn!(
                "header drift for station {}: new header ignored, appending data rows under the stored one",
                self.station
            );
        }

        let mut appended = 0u64;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let row = line.trim_end_matches('\r');
            if let Ok(ts) = row_timestamp(row, self.column) {
                if self.boundary.is_some_and(|boundary| ts <= boundary) {
                    continue; // duplicate or older than coverage
                }
            }
            writeln!(self.out, "{row}")?;
            appended += 1;
        }

        self.rows_appended += appended;
        Ok(appended)
    }

    /// Flush and close, returning the total rows appended
    pub fn finish(mut self) -> Result<u64> {
        self.out.flush()?;
        Ok(self.rows_appended)
    }
}

// =============================================================================
// Backfill writer
// =============================================================================

/// Writer for a fresh station dataset built by a historical backfill.
///
/// The header of the first tabular window becomes the file's single header
/// line; later windows with a different header are warned about and their
/// data rows appended without repeating any header.
pub struct DatasetWriter {
    path: PathBuf,
    out: BufWriter<File>,
    header: Option<String>,
    rows_written: u64,
    station: String,
}

impl DatasetWriter {
    /// Create (or truncate) the dataset file for a backfill
    pub fn create(path: &Path, station: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            header: None,
            rows_written: 0,
            station: station.to_string(),
        })
    }

    /// Write one fetched window; returns the number of data rows written
    pub fn write_window(&mut self, window_text: &str) -> Result<u64> {
        let mut lines = window_text.lines();
        let Some(fetched_header) = lines.next() else {
            return Ok(0);
        };
        let fetched_header = fetched_header.trim_end_matches('\r');

        match &self.header {
            None => {
                writeln!(self.out, "{fetched_header}")?;
                self.header = Some(fetched_header.to_string());
            }
            Some(reference) if fetched_header != reference => {
                warn!(
                    "header drift for station {}: new header ignored, appending data rows under the first one",
                    self.station
                );
            }
            Some(_) => {}
        }

        let mut written = 0u64;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            writeln!(self.out, "{}", line.trim_end_matches('\r'))?;
            written += 1;
        }

        self.rows_written += written;
        Ok(written)
    }

    /// Flush and close; a header-only stub left by a dataless station is
    /// removed so failed backfills do not masquerade as datasets.
    pub fn finish(self) -> Result<u64> {
        let DatasetWriter {
            path,
            mut out,
            header: _,
            rows_written,
            station: _,
        } = self;

        out.flush()?;
        drop(out);

        if rows_written == 0 {
            if let Ok(meta) = fs::metadata(&path) {
                if meta.len() <= EMPTY_STUB_MAX_BYTES {
                    let _ = fs::remove_file(&path);
                }
            }
        }

        Ok(rows_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_dataset(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    // --- naming -------------------------------------------------------------

    #[test]
    fn test_sanitize_station_name() {
        assert_eq!(sanitize_station_name("Dique La Florida"), "Dique_La_Florida");
        assert_eq!(sanitize_station_name("  Merlo  "), "Merlo");
        assert_eq!(sanitize_station_name("Paso/Grande (Sur)"), "PasoGrande_Sur");
        assert_eq!(sanitize_station_name("Cañada Honda"), "Cañada_Honda");
    }

    #[test]
    fn test_sanitize_truncates_excessive_names() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_station_name(&long).chars().count(), 100);
    }

    #[test]
    fn test_station_file_name() {
        assert_eq!(station_file_name("27", "Merlo"), "27_Merlo.csv");
        assert_eq!(
            station_file_name("90", "Dique La Florida"),
            "90_Dique_La_Florida.csv"
        );
    }

    #[test]
    fn test_station_id_from_filename() {
        assert_eq!(
            station_id_from_filename(Path::new("datos/27_Merlo.csv")).as_deref(),
            Some("27")
        );
        assert_eq!(
            station_id_from_filename(Path::new("90_Dique_La_Florida.csv")).as_deref(),
            Some("90")
        );
        assert_eq!(station_id_from_filename(Path::new("sin_id.csv")), None);
        assert_eq!(station_id_from_filename(Path::new("Merlo.csv")), None);
    }

    // --- coverage scan ------------------------------------------------------

    #[test]
    fn test_scan_finds_max_timestamp_even_out_of_order() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "\"Fecha/Hora\";Temp\n\
             02/01/2020 00:00:00;11,0\n\
             01/01/2020 00:00:00;10,5\n\
             03/01/2020 00:00:00;12,0\n\
             01/01/2020 12:00:00;10,8\n",
        );

        let coverage = scan_coverage(&path).unwrap();
        assert_eq!(coverage.header, "\"Fecha/Hora\";Temp");
        assert_eq!(
            coverage.last_timestamp.unwrap().to_string(),
            "2020-01-03 00:00:00"
        );
    }

    #[test]
    fn test_scan_skips_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "Fecha/Hora;Temp\n\
             01/01/2020 00:00:00;10,5\n\
             sin dato;99\n\
             \n\
             corto\n\
             99/99/9999 99:99:99;0\n",
        );

        let coverage = scan_coverage(&path).unwrap();
        assert_eq!(
            coverage.last_timestamp.unwrap().to_string(),
            "2020-01-01 00:00:00"
        );
    }

    #[test]
    fn test_scan_header_only_has_no_boundary() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, "27_Merlo.csv", "Fecha/Hora;Temp\n");

        let coverage = scan_coverage(&path).unwrap();
        assert!(coverage.last_timestamp.is_none());
        assert_eq!(coverage.header, "Fecha/Hora;Temp");
    }

    #[test]
    fn test_scan_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, "27_Merlo.csv", "");

        let coverage = scan_coverage(&path).unwrap();
        assert!(coverage.last_timestamp.is_none());
        assert_eq!(coverage.header, "");
    }

    #[test]
    fn test_scan_uses_detected_timestamp_column() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "Temp;\"Fecha/Hora\"\n10,5;01/01/2020 00:00:00\n11,0;02/01/2020 00:00:00\n",
        );

        let coverage = scan_coverage(&path).unwrap();
        assert_eq!(
            coverage.last_timestamp.unwrap().to_string(),
            "2020-01-02 00:00:00"
        );
    }

    // --- merge writer -------------------------------------------------------

    #[test]
    fn test_append_drops_rows_at_or_before_boundary() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "Fecha/Hora;Temp\n01/01/2020 01:00:00;10,5\n",
        );
        let coverage = scan_coverage(&path).unwrap();

        let mut appender = DatasetAppender::open(&path, &coverage, "27").unwrap();
        // out-of-order interleaving: old, new, equal, new, old
        let appended = appender
            .append_window(
                "Fecha/Hora;Temp\n\
                 01/01/2020 00:30:00;9,0\n\
                 01/01/2020 02:00:00;11,0\n\
                 01/01/2020 01:00:00;10,5\n\
                 01/01/2020 03:00:00;12,0\n\
                 01/01/2020 00:10:00;8,0\n",
            )
            .unwrap();
        assert_eq!(appended, 2);
        assert_eq!(appender.finish().unwrap(), 2);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Fecha/Hora;Temp\n\
             01/01/2020 01:00:00;10,5\n\
             01/01/2020 02:00:00;11,0\n\
             01/01/2020 03:00:00;12,0\n"
        );
    }

    #[test]
    fn test_append_keeps_unparsable_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "Fecha/Hora;Temp\n01/01/2020 01:00:00;10,5\n",
        );
        let coverage = scan_coverage(&path).unwrap();

        let mut appender = DatasetAppender::open(&path, &coverage, "27").unwrap();
        let appended = appender
            .append_window("Fecha/Hora;Temp\nsin dato;99\n")
            .unwrap();
        assert_eq!(appended, 1);
        appender.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("sin dato;99\n"));
    }

    #[test]
    fn test_append_preserves_header_on_drift() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "\"Fecha/Hora\";Temp\n01/01/2020 00:00:00;10,5\n",
        );
        let coverage = scan_coverage(&path).unwrap();

        let mut appender = DatasetAppender::open(&path, &coverage, "27").unwrap();
        appender
            .append_window("FechaHora;Temp\n01/01/2020 01:00:00;11,0\n")
            .unwrap();
        appender.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "\"Fecha/Hora\";Temp");
        assert!(!content.contains("FechaHora;Temp"));
        assert_eq!(lines.last().unwrap(), &"01/01/2020 01:00:00;11,0");
    }

    #[test]
    fn test_append_is_idempotent_after_rescan() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            "27_Merlo.csv",
            "Fecha/Hora;Temp\n01/01/2020 00:00:00;10,5\n",
        );
        let window = "Fecha/Hora;Temp\n01/01/2020 01:00:00;11,0\n01/01/2020 02:00:00;12,0\n";

        let coverage = scan_coverage(&path).unwrap();
        let mut appender = DatasetAppender::open(&path, &coverage, "27").unwrap();
        assert_eq!(appender.append_window(window).unwrap(), 2);
        appender.finish().unwrap();

        // same window again after a rescan: nothing is newer, nothing lands
        let coverage = scan_coverage(&path).unwrap();
        let mut appender = DatasetAppender::open(&path, &coverage, "27").unwrap();
        assert_eq!(appender.append_window(window).unwrap(), 0);
        appender.finish().unwrap();
    }

    #[test]
    fn test_append_normalizes_crlf() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, "27_Merlo.csv", "Fecha/Hora;Temp\n");
        let coverage = scan_coverage(&path).unwrap();

        let mut appender = DatasetAppender::open(&path, &coverage, "27").unwrap();
        appender
            .append_window("Fecha/Hora;Temp\r\n01/01/2020 00:00:00;10,5\r\n")
            .unwrap();
        appender.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains('\r'));
        assert!(content.ends_with("01/01/2020 00:00:00;10,5\n"));
    }

    // --- backfill writer ----------------------------------------------------

    #[test]
    fn test_backfill_round_trip_preserves_rows_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("27_Merlo.csv");

        let mut writer = DatasetWriter::create(&path, "27").unwrap();
        let written = writer
            .write_window(
                "\"Fecha/Hora\";Temp\r\n01/01/2020 00:00:00;10,5\r\n01/01/2020 01:00:00;11,0\r\n",
            )
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(writer.finish().unwrap(), 2);

        // original order, decimal commas untouched, single header
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "\"Fecha/Hora\";Temp\n01/01/2020 00:00:00;10,5\n01/01/2020 01:00:00;11,0\n"
        );
    }

    #[test]
    fn test_backfill_writes_header_once_across_windows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("27_Merlo.csv");

        let mut writer = DatasetWriter::create(&path, "27").unwrap();
        writer
            .write_window("Fecha/Hora;Temp\n01/01/2020 00:00:00;10,5\n")
            .unwrap();
        writer
            .write_window("FechaHora;Temp\n01/02/2020 00:00:00;12,0\n")
            .unwrap();
        writer.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.starts_with("Fecha/Hora;Temp\n"));
        assert!(!content.contains("FechaHora;Temp"));
    }

    #[test]
    fn test_backfill_removes_header_only_stub() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("99_Vacia.csv");

        let mut writer = DatasetWriter::create(&path, "99").unwrap();
        writer.write_window("Fecha/Hora;Temp\n").unwrap();
        assert_eq!(writer.finish().unwrap(), 0);

        assert!(!path.exists());
    }
}
