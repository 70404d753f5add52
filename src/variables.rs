use crate::constants::{
    MAX_TEMPERATURE, MIN_TEMPERATURE, PRECIPITATION, SEA_SURFACE_TEMPERATURE,
};
use crate::error::{Result, Seas5Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SECONDS_PER_DAY: f64 = 86_400.0;
const MM_PER_M: f64 = 1_000.0;
const KELVIN_TO_CELSIUS: f64 = -273.15;

/// Mapping from internal short variable names to the names CDS and the
/// GRIB files use for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    /// Short name -> CDS request `variable`
    pub long_names: BTreeMap<String, String>,
    /// Short name -> GRIB `shortName` inside downloaded files
    pub grib_names: BTreeMap<String, String>,
}

impl Default for Variables {
    fn default() -> Self {
        let long_names = [
            (PRECIPITATION, "total_precipitation"),
            (MAX_TEMPERATURE, "maximum_2m_temperature_in_the_last_24_hours"),
            (MIN_TEMPERATURE, "minimum_2m_temperature_in_the_last_24_hours"),
            (SEA_SURFACE_TEMPERATURE, "sea_surface_temperature"),
        ];
        let grib_names = [
            (PRECIPITATION, "tprate"),
            (MAX_TEMPERATURE, "mx2t24"),
            (MIN_TEMPERATURE, "mn2t24"),
            (SEA_SURFACE_TEMPERATURE, "sst"),
        ];
        Self {
            long_names: long_names
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            grib_names: grib_names
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Variables {
    /// Defaults extended (or replaced, key by key) with caller entries.
    pub fn with_overrides(
        long_names: &BTreeMap<String, String>,
        grib_names: &BTreeMap<String, String>,
    ) -> Self {
        let mut vars = Self::default();
        vars.long_names.extend(long_names.clone());
        vars.grib_names.extend(grib_names.clone());
        vars
    }

    pub fn long_name(&self, vname: &str) -> Result<&str> {
        self.long_names
            .get(vname)
            .map(String::as_str)
            .ok_or_else(|| Seas5Error::UnknownVariable(vname.to_string()))
    }

    pub fn grib_name(&self, vname: &str) -> Result<&str> {
        self.grib_names
            .get(vname)
            .map(String::as_str)
            .ok_or_else(|| Seas5Error::UnknownVariable(vname.to_string()))
    }

    /// All short names known to either mapping, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .long_names
            .keys()
            .chain(self.grib_names.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Unit conversion applied when restructuring a raw file.
    pub fn conversion(&self, vname: &str) -> Result<Conversion> {
        match vname {
            PRECIPITATION => Ok(Conversion::PrecipitationRate),
            MAX_TEMPERATURE | MIN_TEMPERATURE | SEA_SURFACE_TEMPERATURE => {
                Ok(Conversion::KelvinToCelsius)
            }
            _ => Err(Seas5Error::UnsupportedVariable {
                vname: vname.to_string(),
                known: self.grib_names.keys().cloned().collect(),
            }),
        }
    }
}

/// Which forecast statistic a field holds. A spread only takes the
/// multiplicative part of a unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Stdev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// m/s averaged over a month -> mm accumulated over that month
    PrecipitationRate,
    /// K -> degC
    KelvinToCelsius,
}

impl Conversion {
    pub fn units(&self) -> &'static str {
        match self {
            Conversion::PrecipitationRate => "mm",
            Conversion::KelvinToCelsius => "degC",
        }
    }

    /// Convert one value whose valid month has `days_in_month` days.
    pub fn apply(&self, value: f32, days_in_month: u32, statistic: Statistic) -> f32 {
        let v = f64::from(value);
        let out = match self {
            Conversion::PrecipitationRate => {
                v * f64::from(days_in_month) * SECONDS_PER_DAY * MM_PER_M
            }
            Conversion::KelvinToCelsius => match statistic {
                Statistic::Mean => v + KELVIN_TO_CELSIUS,
                Statistic::Stdev => v,
            },
        };
        out as f32
    }
}
