use crate::constants::{grib_file_name, DATA_TYPE_MEAN, DATA_TYPE_STDEV};
use crate::convert::{convert, BoundingBox};
use crate::cube::Cube;
use crate::error::{Result, Seas5Error};
use crate::grib::{read_messages, RawForecast};
use crate::variables::{Statistic, Variables};
use crate::years::resolve_years;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub year_range: Option<(i32, i32)>,
    pub hindcast: bool,
    pub forecast: bool,
    pub bbox: BoundingBox,
    /// Warn and continue when a year's file is absent instead of failing
    pub skip_missing: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            year_range: None,
            hindcast: false,
            forecast: true,
            bbox: BoundingBox::default(),
            skip_missing: false,
        }
    }
}

/// Ensemble mean and spread of one variable for one initialisation month,
/// stacked over years.
#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    pub variable: String,
    pub month: u32,
    pub units: String,
    pub mean: Cube,
    pub stdev: Cube,
}

pub struct Pipeline {
    variables: Variables,
}

impl Pipeline {
    pub fn new(variables: Variables) -> Self {
        Self { variables }
    }

    /// Convert the `fcmean` and `fcstdev` fields of one file.
    #[instrument(skip(self, path, bbox), fields(path = %path.display()))]
    fn process_file(&self, path: &Path, vname: &str, bbox: &BoundingBox) -> Result<(Cube, Cube)> {
        let short_name = self.variables.grib_name(vname)?;
        let messages = read_messages(path)?;

        let raw_mean = RawForecast::from_messages(path, &messages, short_name, DATA_TYPE_MEAN)?;
        let raw_stdev = RawForecast::from_messages(path, &messages, short_name, DATA_TYPE_STDEV)?;
        debug!(
            "Initialised {} with {} members and {} leads",
            raw_mean.reference_time,
            raw_mean.numbers.len(),
            raw_mean.valid_times.len()
        );

        let mean = convert(&raw_mean, vname, &self.variables, Statistic::Mean, bbox)?;
        let stdev = convert(&raw_stdev, vname, &self.variables, Statistic::Stdev, bbox)?;
        Ok((mean, stdev))
    }

    /// Process every year's `{vname}_{year}_{month}.grib` under `inpath`
    /// into one dataset with dims `[number, time, latitude, longitude]`.
    pub fn process(
        &self,
        inpath: &Path,
        vname: &str,
        month: u32,
        options: &ProcessOptions,
        this_year: i32,
    ) -> Result<ProcessedDataset> {
        // Fail early on variables we cannot convert
        self.variables.conversion(vname)?;
        let years = resolve_years(options.year_range, options.hindcast, options.forecast, this_year)?;

        let mut means = Vec::new();
        let mut stdevs = Vec::new();
        for year in years {
            let path = inpath.join(grib_file_name(vname, year, month));
            if !path.exists() {
                if options.skip_missing {
                    warn!("Skipping missing file {}", path.display());
                    continue;
                }
                return Err(Seas5Error::MissingFile(path));
            }
            let (mean, stdev) = self.process_file(&path, vname, &options.bbox)?;
            means.push(mean);
            stdevs.push(stdev);
        }

        if means.is_empty() {
            return Err(Seas5Error::NoData(format!(
                "no {vname} files for month {month:02} in {}",
                inpath.display()
            )));
        }

        let (mean, stdev) = Cube::align(&Cube::concat_time(&means)?, &Cube::concat_time(&stdevs)?)?;
        info!(
            "Processed {} files into {:?} ({} members, {} times)",
            means.len(),
            mean.shape(),
            mean.numbers.len(),
            mean.times.len()
        );

        Ok(ProcessedDataset {
            variable: vname.to_string(),
            month,
            units: mean.units.clone(),
            mean,
            stdev,
        })
    }
}
