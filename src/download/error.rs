use std::path::PathBuf;

use thiserror::Error;

/// Per-item failures. Each one abandons a single item; the run carries on.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid creation time {value:?} on item {id}: {source}")]
    InvalidTimestamp {
        id: String,
        value: String,
        source: chrono::ParseError,
    },

    #[error("Item {0} has no usable filename")]
    MissingFilename(String),

    #[error("Unable to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP error {status}")]
    HttpStatus { status: u16 },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),
}
