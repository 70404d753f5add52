//! Zarr V3 output for processed datasets.
//!
//! Layout under the store root:
//! `mean`, `stdev` (float32, `[number, time, latitude, longitude]`, one chunk
//! per time step) and 1-D coordinate arrays `number`, `time`, `latitude`,
//! `longitude`.

use crate::cube::{Cube, DIMENSIONS};
use crate::error::{Result, Seas5Error};
use crate::pipeline::ProcessedDataset;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use zarrs::array::{Array, ArrayBuilder, DataType, Element, ElementOwned, FillValue};
use zarrs::filesystem::FilesystemStore;
use zarrs::group::{Group, GroupBuilder};

pub const TIME_UNITS: &str = "hours since 1970-01-01 00:00:00";

type Store = Arc<FilesystemStore>;

fn store_err<E: std::fmt::Display>(e: E) -> Seas5Error {
    Seas5Error::Store(e.to_string())
}

fn open_store(path: &Path) -> Result<Store> {
    Ok(Arc::new(FilesystemStore::new(path).map_err(store_err)?))
}

fn attributes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_array<T: Element>(
    store: &Store,
    name: &str,
    shape: Vec<u64>,
    chunk_shape: Vec<u64>,
    data_type: DataType,
    fill_value: FillValue,
    dimension_names: &[&str],
    attrs: Value,
    data: &[T],
) -> Result<()> {
    let array = ArrayBuilder::new(shape, chunk_shape, data_type, fill_value)
        .dimension_names(Some(dimension_names.to_vec()))
        .attributes(attributes(attrs))
        .build(store.clone(), &format!("/{name}"))
        .map_err(store_err)?;
    array.store_metadata().map_err(store_err)?;
    if !data.is_empty() {
        array
            .store_array_subset_elements::<T>(&array.subset_all(), data)
            .map_err(store_err)?;
    }
    Ok(())
}

fn write_cube(store: &Store, cube: &Cube) -> Result<()> {
    let shape: Vec<u64> = cube.shape().iter().map(|&d| d as u64).collect();
    let chunk_shape = vec![shape[0].max(1), 1, shape[2].max(1), shape[3].max(1)];
    let data: Vec<f32> = cube.values.iter().copied().collect();
    write_array(
        store,
        &cube.name,
        shape,
        chunk_shape,
        DataType::Float32,
        FillValue::from(f32::NAN),
        &DIMENSIONS,
        json!({ "units": cube.units, "long_name": format!("ensemble {}", cube.name) }),
        &data,
    )
}

fn write_coordinates(store: &Store, cube: &Cube) -> Result<()> {
    let numbers: Vec<i32> = cube.numbers.iter().map(|&n| i32::from(n)).collect();
    let hours: Vec<i64> = cube
        .times
        .iter()
        .map(|t| t.and_utc().timestamp() / 3600)
        .collect();

    let len = |n: usize| vec![n as u64];
    let chunk = |n: usize| vec![(n as u64).max(1)];

    write_array(
        store,
        "number",
        len(numbers.len()),
        chunk(numbers.len()),
        DataType::Int32,
        FillValue::from(0i32),
        &["number"],
        json!({ "long_name": "ensemble member numerical id" }),
        &numbers,
    )?;
    write_array(
        store,
        "time",
        len(hours.len()),
        chunk(hours.len()),
        DataType::Int64,
        FillValue::from(0i64),
        &["time"],
        json!({ "units": TIME_UNITS, "calendar": "proleptic_gregorian" }),
        &hours,
    )?;
    write_array(
        store,
        "latitude",
        len(cube.latitudes.len()),
        chunk(cube.latitudes.len()),
        DataType::Float64,
        FillValue::from(f64::NAN),
        &["latitude"],
        json!({ "units": "degrees_north" }),
        &cube.latitudes,
    )?;
    write_array(
        store,
        "longitude",
        len(cube.longitudes.len()),
        chunk(cube.longitudes.len()),
        DataType::Float64,
        FillValue::from(f64::NAN),
        &["longitude"],
        json!({ "units": "degrees_east" }),
        &cube.longitudes,
    )
}

/// Write `dataset` as a Zarr hierarchy rooted at `path`. `mean` and `stdev`
/// must share every coordinate.
pub fn write_zarr(dataset: &ProcessedDataset, path: &Path) -> Result<()> {
    let (mean, stdev) = (&dataset.mean, &dataset.stdev);
    if mean.numbers != stdev.numbers
        || mean.times != stdev.times
        || mean.latitudes != stdev.latitudes
        || mean.longitudes != stdev.longitudes
    {
        return Err(Seas5Error::GridMismatch(format!(
            "mean {:?} and stdev {:?} do not share coordinates",
            mean.shape(),
            stdev.shape()
        )));
    }
    fs::create_dir_all(path)?;
    let store = open_store(path)?;

    let group_attrs = json!({
        "variable": dataset.variable,
        "month": dataset.month,
        "units": dataset.units,
        "source": "ECMWF SEAS5 seasonal-monthly-single-levels",
        "version": crate::VERSION,
    });
    GroupBuilder::new()
        .attributes(attributes(group_attrs))
        .build(store.clone(), "/")
        .map_err(store_err)?
        .store_metadata()
        .map_err(store_err)?;

    write_cube(&store, &dataset.mean)?;
    write_cube(&store, &dataset.stdev)?;
    write_coordinates(&store, &dataset.mean)?;

    info!("Wrote {} to {}", dataset.variable, path.display());
    Ok(())
}

/// Shape, attributes and values of one stored array
#[derive(Debug, Clone)]
pub struct StoredArray<T> {
    pub shape: Vec<u64>,
    pub attributes: Map<String, Value>,
    pub values: Vec<T>,
}

pub fn read_array<T: ElementOwned>(path: &Path, name: &str) -> Result<StoredArray<T>> {
    let store = open_store(path)?;
    let array = Array::open(store, &format!("/{name}")).map_err(store_err)?;
    let values = array
        .retrieve_array_subset_elements::<T>(&array.subset_all())
        .map_err(store_err)?;
    Ok(StoredArray {
        shape: array.shape().to_vec(),
        attributes: array.attributes().clone(),
        values,
    })
}

pub fn read_group_attributes(path: &Path) -> Result<Map<String, Value>> {
    let store = open_store(path)?;
    let group = Group::open(store, "/").map_err(store_err)?;
    Ok(group.attributes().clone())
}

/// What `inspect` reports about a written store
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreSummary {
    pub attributes: Map<String, Value>,
    pub arrays: Vec<(String, Vec<u64>)>,
}

pub fn inspect(path: &Path) -> Result<StoreSummary> {
    if !path.exists() {
        return Err(Seas5Error::MissingFile(path.to_path_buf()));
    }
    let attributes = read_group_attributes(path)?;
    let store = open_store(path)?;
    let mut arrays = Vec::new();
    for name in ["mean", "stdev", "number", "time", "latitude", "longitude"] {
        let array = Array::open(store.clone(), &format!("/{name}")).map_err(store_err)?;
        arrays.push((name.to_string(), array.shape().to_vec()));
    }
    Ok(StoreSummary { attributes, arrays })
}
