use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Seas5Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CDS API error: {message}")]
    Api { message: String },

    #[error("CDS job {job_id} ended with status '{status}'")]
    JobFailed { job_id: String, status: String },

    #[error("Timed out waiting for CDS job {0}")]
    Timeout(String),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("vname must be one of {known:?}, got '{vname}'")]
    UnsupportedVariable { vname: String, known: Vec<String> },

    #[error("No years left in range {start:?}..={end:?} for hindcast={hindcast}, forecast={forecast}")]
    EmptyYearRange {
        start: Option<i32>,
        end: Option<i32>,
        hindcast: bool,
        forecast: bool,
    },

    #[error("GRIB decoding failed: {0}")]
    Grib(String),

    #[error("{path}: dataset has more than one forecast date - ensure file has a single forecast date only")]
    MultipleForecastDates { path: PathBuf },

    #[error("{path}: no '{short_name}' messages with dataType '{data_type}'")]
    MissingVariable {
        path: PathBuf,
        short_name: String,
        data_type: String,
    },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Input file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Zarr store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Seas5Error>;
