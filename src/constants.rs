//! Names and fixed request parameters shared across the crate.

// Internal short variable names (used in CLI and file names)
pub const PRECIPITATION: &str = "pre";
pub const MAX_TEMPERATURE: &str = "tmax";
pub const MIN_TEMPERATURE: &str = "tmin";
pub const SEA_SURFACE_TEMPERATURE: &str = "sst";

// CDS dataset and fixed request fields
pub const DEFAULT_CDS_URL: &str = "https://cds.climate.copernicus.eu/api";
pub const SEASONAL_MONTHLY_DATASET: &str = "seasonal-monthly-single-levels";
pub const ORIGINATING_CENTRE: &str = "ecmwf";
pub const SYSTEM: &str = "51";
pub const DATA_FORMAT: &str = "grib";
pub const PRODUCT_TYPES: [&str; 4] = [
    "monthly_mean",
    "monthly_standard_deviation",
    "monthly_maximum",
    "monthly_minimum",
];
pub const LEADTIME_MONTHS: std::ops::RangeInclusive<u32> = 1..=6;

// Archive availability: hindcast has 25 members, operational forecast 51
pub const HINDCAST_FIRST_YEAR: i32 = 1981;
pub const HINDCAST_LAST_YEAR: i32 = 2016;
pub const FORECAST_FIRST_YEAR: i32 = 2017;

// GRIB dataType keys for the statistics we stack
pub const DATA_TYPE_MEAN: &str = "fcmean";
pub const DATA_TYPE_STDEV: &str = "fcstdev";

// Download bookkeeping
pub const DOWNLOAD_LOG: &str = "downloads.log";
pub const DOWNLOAD_MANIFEST: &str = "downloads.ndjson";

/// File name of one variable-month archive, e.g. `pre_2020_03.grib`.
pub fn grib_file_name(vname: &str, year: i32, month: u32) -> String {
    format!("{vname}_{year}_{month:02}.grib")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grib_file_name_pads_month() {
        assert_eq!(grib_file_name("pre", 2020, 3), "pre_2020_03.grib");
        assert_eq!(grib_file_name("sst", 1981, 12), "sst_1981_12.grib");
    }
}
