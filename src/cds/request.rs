use crate::constants::{
    DATA_FORMAT, LEADTIME_MONTHS, ORIGINATING_CENTRE, PRODUCT_TYPES, SYSTEM,
};
use serde::{Deserialize, Serialize};

/// Request body for `seasonal-monthly-single-levels`: every monthly
/// statistic for one variable, one initialisation month and six lead months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalRequest {
    pub originating_centre: String,
    pub system: String,
    pub variable: Vec<String>,
    pub product_type: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    pub leadtime_month: Vec<String>,
    pub data_format: String,
}

impl SeasonalRequest {
    pub fn monthly(long_name: &str, year: i32, month: u32) -> Self {
        Self {
            originating_centre: ORIGINATING_CENTRE.to_string(),
            system: SYSTEM.to_string(),
            variable: vec![long_name.to_string()],
            product_type: PRODUCT_TYPES.iter().map(|s| s.to_string()).collect(),
            year: vec![year.to_string()],
            month: vec![format!("{month:02}")],
            leadtime_month: LEADTIME_MONTHS.map(|m| m.to_string()).collect(),
            data_format: DATA_FORMAT.to_string(),
        }
    }
}
