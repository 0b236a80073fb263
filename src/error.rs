//! Error types for the fetch loop and the low-light report.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("cannot create {path}: {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("network error on {date}: {source}")]
    Network {
        date: NaiveDate,
        #[source]
        source: reqwest::Error,
    },

    #[error("API returned {status} for {date}")]
    Status {
        date: NaiveDate,
        status: reqwest::StatusCode,
    },

    #[error("failed to read response body for {date}: {source}")]
    BodyRead {
        date: NaiveDate,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse JSON for {date}: {source}")]
    JsonParse {
        date: NaiveDate,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing or malformed field '{field}' for {date}")]
    MissingField { date: NaiveDate, field: &'static str },

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("failed to write CSV row: {0}")]
    CsvWrite(#[from] csv::Error),

    #[error("failed to flush output: {0}")]
    Flush(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Whether this failure belongs to a single day and may be skipped under
    /// a lenient policy. Output-side failures never are.
    pub fn is_per_day(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Status { .. }
                | Self::BodyRead { .. }
                | Self::JsonParse { .. }
                | Self::MissingField { .. }
                | Self::InvalidTimestamp(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum LowLightError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("failed to write report: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush report: {0}")]
    Flush(#[from] std::io::Error),
}
