//! Reading SEAS5 GRIB archives.

pub mod codec;
pub mod forecast;
pub mod tables;

pub use codec::{decode_message, decode_messages, Grid, LocalSection, Message};
pub use forecast::{read_messages, RawForecast};
