//! Error types for the crag ranking pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// The input route export could not be turned into a [`RouteTable`].
///
/// [`RouteTable`]: crate::loader::RouteTable
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("input file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no header row", path.display())]
    MissingHeader { path: PathBuf },

    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("malformed CSV in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} line {line}: invalid 'Avg Stars' value '{value}'", path.display())]
    InvalidStars {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// The run configuration is unusable.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown rating bucket '{0}' (expected one of: <= 5.6, 5.7-5.9, 5.10a-d, 5.11a-d, 5.12a-d)")]
    UnknownBucket(String),

    #[error("buckets '{first}' and '{second}' share priority {priority}")]
    DuplicatePriority {
        first: String,
        second: String,
        priority: u32,
    },

    #[error("invalid area name '{0}'")]
    InvalidArea(String),

    #[error("failed to read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Writing an output table failed.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
