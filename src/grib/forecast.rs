use crate::error::{Result, Seas5Error};
use crate::grib::codec::{decode_messages, Grid, Message};
use chrono::NaiveDateTime;
use ndarray::{s, Array4, ArrayView2};
use std::path::Path;
use tracing::{debug, warn};

/// Read and decode every message in a GRIB file.
pub fn read_messages(path: &Path) -> Result<Vec<Message>> {
    if !path.exists() {
        return Err(Seas5Error::MissingFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let messages = decode_messages(&bytes)?;
    debug!("Decoded {} messages from {}", messages.len(), path.display());
    Ok(messages)
}

/// One variable and statistic of a single-initialisation seasonal file,
/// laid out `[number, lead, latitude, longitude]` with members and leads sorted.
#[derive(Debug, Clone)]
pub struct RawForecast {
    pub short_name: String,
    pub data_type: String,
    pub reference_time: NaiveDateTime,
    pub numbers: Vec<u16>,
    /// Valid time of each lead, ascending
    pub valid_times: Vec<NaiveDateTime>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Array4<f32>,
}

impl RawForecast {
    pub fn open(path: &Path, short_name: &str, data_type: &str) -> Result<Self> {
        let messages = read_messages(path)?;
        Self::from_messages(path, &messages, short_name, data_type)
    }

    /// Assemble the messages matching `short_name` and `data_type`. `path`
    /// only labels errors.
    pub fn from_messages(
        path: &Path,
        messages: &[Message],
        short_name: &str,
        data_type: &str,
    ) -> Result<Self> {
        let selected: Vec<&Message> = messages
            .iter()
            .filter(|m| m.data_type() == data_type && m.short_name() == short_name)
            .collect();
        let first = *selected.first().ok_or_else(|| Seas5Error::MissingVariable {
            path: path.to_path_buf(),
            short_name: short_name.to_string(),
            data_type: data_type.to_string(),
        })?;

        if selected
            .iter()
            .any(|m| m.reference_time != first.reference_time)
        {
            return Err(Seas5Error::MultipleForecastDates {
                path: path.to_path_buf(),
            });
        }
        let grid: &Grid = &first.grid;
        if let Some(other) = selected.iter().find(|m| m.grid != *grid) {
            return Err(Seas5Error::GridMismatch(format!(
                "{}: {}x{} grid differs from {}x{}",
                path.display(),
                other.grid.ni,
                other.grid.nj,
                grid.ni,
                grid.nj
            )));
        }

        let mut numbers: Vec<u16> = selected.iter().map(|m| m.number()).collect();
        numbers.sort_unstable();
        numbers.dedup();

        let mut keyed = Vec::with_capacity(selected.len());
        for m in &selected {
            keyed.push((m.number(), m.valid_time()?, *m));
        }
        let mut valid_times: Vec<NaiveDateTime> = keyed.iter().map(|(_, t, _)| *t).collect();
        valid_times.sort_unstable();
        valid_times.dedup();

        let (nj, ni) = (grid.nj, grid.ni);
        let mut values = Array4::<f32>::from_elem((numbers.len(), valid_times.len(), nj, ni), f32::NAN);
        let mut filled = vec![false; numbers.len() * valid_times.len()];

        for (number, time, message) in keyed {
            let n = numbers.binary_search(&number).unwrap_or_default();
            let t = valid_times.binary_search(&time).unwrap_or_default();
            if std::mem::replace(&mut filled[n * valid_times.len() + t], true) {
                warn!(
                    "{}: duplicate field for member {} at {}, keeping the later one",
                    path.display(),
                    number,
                    time
                );
            }
            let field = ArrayView2::from_shape((nj, ni), &message.values[..])
                .map_err(|e| Seas5Error::Grib(format!("{}: {}", path.display(), e)))?;
            values.slice_mut(s![n, t, .., ..]).assign(&field);
        }

        Ok(Self {
            short_name: short_name.to_string(),
            data_type: data_type.to_string(),
            reference_time: first.reference_time,
            numbers,
            valid_times,
            latitudes: grid.latitudes(),
            longitudes: grid.longitudes(),
            values,
        })
    }
}
