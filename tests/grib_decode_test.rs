mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{encode, small_grid, write_grib, TestField, TestGrid, MARS_FCMEAN, MARS_FCSTDEV};
use seas5tools::error::Seas5Error;
use seas5tools::grib::{decode_messages, RawForecast};
use tempfile::tempdir;

fn field(number: u16, forecast_month: u16, mars_type: u8, values: Vec<f32>) -> TestField {
    TestField {
        table_version: 128,
        parameter: 34,
        mars_type,
        number,
        forecast_month,
        year: 2020,
        month: 11,
        grid: small_grid(),
        decimal_scale: 2,
        values,
    }
}

fn ramp(offset: f32) -> Vec<f32> {
    (0..12).map(|k| offset + k as f32 * 0.25).collect()
}

#[test]
fn test_decode_seasonal_message() -> Result<()> {
    let bytes = encode(&field(7, 3, MARS_FCMEAN, ramp(280.0)));
    let messages = decode_messages(&bytes)?;
    assert_eq!(messages.len(), 1);

    let m = &messages[0];
    assert_eq!(m.short_name(), "sst");
    assert_eq!(m.data_type(), "fcmean");
    assert_eq!(m.number(), 7);
    assert_eq!(
        m.reference_time,
        NaiveDate::from_ymd_opt(2020, 11, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    );
    // forecast month 3 from November is January of the next year
    assert_eq!(
        m.valid_time()?,
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    );
    assert_eq!(m.grid.latitudes(), vec![10.0, 0.0, -10.0]);
    assert_eq!(m.grid.longitudes(), vec![0.0, 90.0, 180.0, 270.0]);
    for (k, v) in m.values.iter().enumerate() {
        assert!((v - (280.0 + k as f32 * 0.25)).abs() < 1e-4, "point {k}: {v}");
    }
    Ok(())
}

#[test]
fn test_bitmap_marks_missing_points() -> Result<()> {
    let mut values = ramp(271.0);
    values[0] = f32::NAN;
    values[5] = f32::NAN;
    let messages = decode_messages(&encode(&field(0, 1, MARS_FCMEAN, values)))?;

    let decoded = &messages[0].values;
    assert!(decoded[0].is_nan());
    assert!(decoded[5].is_nan());
    assert!((decoded[1] - 271.25).abs() < 1e-4);
    assert!((decoded[11] - 273.75).abs() < 1e-4);
    Ok(())
}

#[test]
fn test_constant_field_packs_with_zero_bits() -> Result<()> {
    let messages = decode_messages(&encode(&field(0, 1, MARS_FCSTDEV, vec![1.5; 12])))?;
    assert_eq!(messages[0].data_type(), "fcstdev");
    assert!(messages[0].values.iter().all(|v| (v - 1.5).abs() < 1e-6));
    Ok(())
}

#[test]
fn test_raw_forecast_sorts_members_and_leads() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("sst_2020_11.grib");
    // written out of order on purpose
    write_grib(
        &path,
        &[
            field(1, 2, MARS_FCMEAN, ramp(300.0)),
            field(0, 2, MARS_FCMEAN, ramp(200.0)),
            field(1, 1, MARS_FCMEAN, ramp(100.0)),
            field(0, 1, MARS_FCMEAN, ramp(0.0)),
            field(0, 1, MARS_FCSTDEV, ramp(1.0)),
        ],
    );

    let raw = RawForecast::open(&path, "sst", "fcmean")?;
    assert_eq!(raw.numbers, vec![0, 1]);
    assert_eq!(raw.valid_times.len(), 2);
    assert!(raw.valid_times[0] < raw.valid_times[1]);
    assert_eq!(raw.values.shape(), &[2, 2, 3, 4]);
    assert!((raw.values[[0, 0, 0, 0]] - 0.0).abs() < 1e-4);
    assert!((raw.values[[1, 0, 0, 0]] - 100.0).abs() < 1e-4);
    assert!((raw.values[[0, 1, 0, 0]] - 200.0).abs() < 1e-4);
    assert!((raw.values[[1, 1, 2, 3]] - 302.75).abs() < 1e-4);

    let stdev = RawForecast::open(&path, "sst", "fcstdev")?;
    assert_eq!(stdev.numbers, vec![0]);
    Ok(())
}

#[test]
fn test_missing_statistic_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sst_2020_11.grib");
    write_grib(&path, &[field(0, 1, MARS_FCMEAN, ramp(0.0))]);

    let err = RawForecast::open(&path, "sst", "fcstdev").unwrap_err();
    assert!(matches!(
        err,
        Seas5Error::MissingVariable { ref data_type, .. } if data_type == "fcstdev"
    ));
}

#[test]
fn test_multiple_forecast_dates_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sst_2020_11.grib");
    let mut later = field(0, 1, MARS_FCMEAN, ramp(0.0));
    later.month = 12;
    write_grib(&path, &[field(0, 1, MARS_FCMEAN, ramp(0.0)), later]);

    let err = RawForecast::open(&path, "sst", "fcmean").unwrap_err();
    assert!(matches!(err, Seas5Error::MultipleForecastDates { .. }));
    assert!(err.to_string().contains("single forecast date"));
}

#[test]
fn test_members_on_different_grids_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sst_2020_11.grib");
    let mut coarse = field(1, 1, MARS_FCMEAN, vec![280.0, 281.0, 282.0, 283.0]);
    coarse.grid = TestGrid {
        ni: 2,
        nj: 2,
        la1: 10.0,
        lo1: 0.0,
        la2: -10.0,
        lo2: 180.0,
    };
    write_grib(&path, &[field(0, 1, MARS_FCMEAN, ramp(0.0)), coarse]);

    let err = RawForecast::open(&path, "sst", "fcmean").unwrap_err();
    assert!(matches!(err, Seas5Error::GridMismatch(_)));
    assert!(err.to_string().contains("2x2 grid differs from 4x3"));
}

#[test]
fn test_truncated_file_is_an_error() {
    let mut bytes = encode(&field(0, 1, MARS_FCMEAN, ramp(0.0)));
    bytes.truncate(bytes.len() - 10);
    assert!(matches!(decode_messages(&bytes), Err(Seas5Error::Grib(_))));
}
