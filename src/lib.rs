pub mod cds;
pub mod config;
pub mod constants;
pub mod convert;
pub mod cube;
pub mod download;
pub mod download_log;
pub mod error;
pub mod grib;
pub mod inventory;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod types;
pub mod variables;
pub mod years;

/// Package version as published in the manifest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
