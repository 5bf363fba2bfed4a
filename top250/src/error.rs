use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to fetch one listing page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid listing URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("listing responded with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Failure to read or write the persisted record file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record file not found: {0}")]
    NotFound(PathBuf),

    #[error("refusing to write an empty record set")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
