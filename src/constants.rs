//! Application constants for the REM archiver
//!
//! This module contains the portal endpoints, retry and pacing defaults,
//! station tag filters, and storage conventions used throughout the tool.

// =============================================================================
// Portal Endpoints
// =============================================================================

/// Base URL of the REM climate portal (San Luis, AR)
pub const PORTAL_BASE_URL: &str = "https://clima.sanluis.gob.ar";

/// CSV download endpoint, parameterized by station and date range
pub const CSV_ENDPOINT: &str = "/ObtenerCsv.aspx";

/// Report page listing every known station in a `<select>` element
pub const STATION_INDEX_ENDPOINT: &str = "/InformePorPeriodo.aspx";

/// Innocuous User-Agent sent with every request
pub const USER_AGENT: &str = "Mozilla/5.0 (rem-archiver)";

// =============================================================================
// Retry, Backoff, and Pacing Defaults
// =============================================================================

/// Attempts per request before surfacing a fetch failure
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Initial backoff delay after a failed attempt, in milliseconds
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 800;

/// Multiplier applied to the backoff delay after each failed attempt
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.8;

/// Per-request timeout, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 45;

/// Courtesy pause between consecutive requests, in milliseconds
pub const DEFAULT_RATE_LIMIT_MS: u64 = 250;

// =============================================================================
// Sync Range Defaults
// =============================================================================

/// First year of the REM historical record
pub const DEFAULT_BACKFILL_START_YEAR: i32 = 2007;

/// Lookback window for a dataset file that exists but holds no data rows
pub const DEFAULT_FALLBACK_LOOKBACK_DAYS: i64 = 60;

// =============================================================================
// Station Tag Filters
// =============================================================================

/// Station qualifier tags with real observation data behind the CSV endpoint
pub const ALLOWED_STATION_TAGS: &[&str] = &["REM", "SLA"];

/// Forecast and test variants that only ever answer with HTML placeholders
pub const EXCLUDED_STATION_TAGS: &[&str] = &["PRONO", "TEST", "TEST1", "REM1", "SLA1"];

// =============================================================================
// Dataset File Conventions
// =============================================================================

/// Default directory holding one CSV per station
pub const DEFAULT_DATA_DIR: &str = "datos_masivos";

/// Timestamp format used by the portal: `DD/MM/YYYY HH:MM:SS`
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Field delimiter of both the remote payloads and the stored datasets
pub const FIELD_DELIMITER: char = ';';

/// Accepted spellings of the timestamp column, after quote/space/case folding
pub const TIMESTAMP_COLUMN_NAMES: &[&str] = &["fechahora", "fecha/hora", "fecha_hora"];

/// A backfill output at or below this size is a header-only stub and is removed
pub const EMPTY_STUB_MAX_BYTES: u64 = 128;

/// Maximum length of a sanitized station name used in file names
pub const MAX_STATION_NAME_LEN: usize = 100;
