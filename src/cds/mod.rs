//! Copernicus Climate Data Store access.

pub mod client;
pub mod request;

pub use client::CdsClient;
pub use request::SeasonalRequest;
