use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal start-up errors. Anything in here stops the run before the first fetch.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid year: {0}")]
    InvalidYear(i32),

    #[error("Proximity window must be at least 1 word")]
    InvalidWindow,

    #[error("Confidence threshold must be between 0 and 10, got {0}")]
    InvalidThreshold(u8),

    #[error("Lexicon set `{0}` is empty")]
    EmptyLexicon(&'static str),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}
