use std::path::PathBuf;

use thiserror::Error;

/// Input grid does not have the shape the configuration expects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("row {row}: expected {expected} location columns, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Analysis index that a worksheet cannot address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("row {0} is past the last sheet row")]
    RowOutOfRange(usize),
    #[error("location {0} is past the last sheet column")]
    ColumnOutOfRange(usize),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
