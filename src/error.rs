//! Error handling for REM archive operations.
//!
//! Provides a closed set of error variants with context for download
//! failures, storage problems, and row-level parse failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed for station {station}: {cause} (url: {url})")]
    FetchFailed {
        station: String,
        url: String,
        cause: String,
    },

    #[error("data directory not found at: {path} - run a backfill first")]
    StorageMissing { path: PathBuf },

    #[error("station {station_id} ({name}) returned no usable data over the whole range")]
    NoUsableData { station_id: String, name: String },

    #[error("malformed row: {reason}")]
    MalformedRow { reason: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, RemError>;
