use crate::cube::Cube;
use crate::error::Result;
use crate::grib::RawForecast;
use crate::variables::{Statistic, Variables};
use chrono::{Datelike, NaiveDateTime};
use ndarray::Axis;
use std::cmp::Ordering;

/// Inclusive latitude/longitude subset; `None` leaves that side open.
/// Longitudes are in the -180..180 convention.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub lat: (Option<f64>, Option<f64>),
    pub lon: (Option<f64>, Option<f64>),
}

fn within(v: f64, (lo, hi): (Option<f64>, Option<f64>)) -> bool {
    lo.map_or(true, |lo| v >= lo) && hi.map_or(true, |hi| v <= hi)
}

/// Map a 0..360 longitude onto -180..180.
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

pub fn days_in_month(t: NaiveDateTime) -> u32 {
    u32::from(t.date().num_days_in_month())
}

/// Indices of `coords` inside `range`, ordered by ascending coordinate.
fn sorted_selection(coords: &[f64], range: (Option<f64>, Option<f64>)) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..coords.len()).filter(|&i| within(coords[i], range)).collect();
    idx.sort_by(|&a, &b| coords[a].partial_cmp(&coords[b]).unwrap_or(Ordering::Equal));
    idx
}

/// Restructure one decoded file: leads become effective dates, longitudes
/// move to -180..180, both horizontal axes are sorted ascending and cut to
/// `bbox`, and values are converted to output units.
pub fn convert(
    raw: &RawForecast,
    vname: &str,
    variables: &Variables,
    statistic: Statistic,
    bbox: &BoundingBox,
) -> Result<Cube> {
    let conversion = variables.conversion(vname)?;

    let longitudes: Vec<f64> = raw.longitudes.iter().map(|&l| wrap_longitude(l)).collect();
    let lat_idx = sorted_selection(&raw.latitudes, bbox.lat);
    let lon_idx = sorted_selection(&longitudes, bbox.lon);

    let mut values = raw
        .values
        .select(Axis(2), &lat_idx)
        .select(Axis(3), &lon_idx);

    for (t, mut slab) in values.axis_iter_mut(Axis(1)).enumerate() {
        let days = days_in_month(raw.valid_times[t]);
        slab.mapv_inplace(|v| conversion.apply(v, days, statistic));
    }

    let name = match statistic {
        Statistic::Mean => "mean",
        Statistic::Stdev => "stdev",
    };
    Ok(Cube {
        name: name.to_string(),
        units: conversion.units().to_string(),
        numbers: raw.numbers.clone(),
        times: raw.valid_times.clone(),
        latitudes: lat_idx.iter().map(|&i| raw.latitudes[i]).collect(),
        longitudes: lon_idx.iter().map(|&i| longitudes[i]).collect(),
        values,
    })
}
