use crate::cds::SeasonalRequest;
use crate::constants::{grib_file_name, SEASONAL_MONTHLY_DATASET};
use crate::download_log::{DownloadLog, Outcome};
use crate::error::Result;
use crate::types::Retriever;
use crate::variables::Variables;
use crate::years::resolve_years;
use metrics::counter;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Which months and archives to fetch
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub year_range: Option<(i32, i32)>,
    /// Defaults to the full year
    pub months: Option<Vec<u32>>,
    pub hindcast: bool,
    pub forecast: bool,
    /// Re-fetch files that already exist
    pub overwrite: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            year_range: None,
            months: None,
            hindcast: false,
            forecast: true,
            overwrite: false,
        }
    }
}

/// Result of a batch download
#[derive(Debug, Default, Serialize)]
pub struct DownloadSummary {
    pub requested: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
}

pub struct Downloader {
    retriever: Arc<dyn Retriever>,
    variables: Variables,
}

impl Downloader {
    pub fn new(retriever: Arc<dyn Retriever>, variables: Variables) -> Self {
        Self {
            retriever,
            variables,
        }
    }

    /// Download seasonal monthly statistics for one variable, one file per
    /// initialisation year and month. A failed month is logged and the batch
    /// moves on.
    pub async fn download(
        &self,
        vname: &str,
        outpath: &Path,
        options: &DownloadOptions,
        this_year: i32,
    ) -> Result<DownloadSummary> {
        let long_name = self.variables.long_name(vname)?.to_string();
        let years = resolve_years(options.year_range, options.hindcast, options.forecast, this_year)?;
        let months: Vec<u32> = options.months.clone().unwrap_or_else(|| (1..=12).collect());

        let mut log = DownloadLog::open(outpath)?;
        let mut summary = DownloadSummary::default();

        for year in years {
            for &month in &months {
                summary.requested += 1;
                let fname = grib_file_name(vname, year, month);
                let target = outpath.join(&fname);
                log.begin(vname, year, month)?;

                if !options.overwrite && target.exists() {
                    info!("Skipping {} as it exists in directory.", fname);
                    log.finish(Outcome::Skipped)?;
                    summary.skipped += 1;
                    counter!("seas5_downloads_skipped_total", "vname" => vname.to_string()).increment(1);
                    continue;
                }

                let request = SeasonalRequest::monthly(&long_name, year, month);
                let span = info_span!("retrieve", vname = %vname, year, month);
                let result = self
                    .retriever
                    .retrieve(SEASONAL_MONTHLY_DATASET, &request, &target)
                    .instrument(span)
                    .await;

                match result {
                    Ok(receipt) => {
                        log.finish(Outcome::Complete)?;
                        if let Err(e) = log.record(vname, year, month, &fname, &receipt) {
                            warn!("Could not record {} in {}: {}", fname, log.manifest_path().display(), e);
                        }
                        summary.completed += 1;
                        counter!("seas5_downloads_completed_total", "vname" => vname.to_string()).increment(1);
                    }
                    Err(e) => {
                        error!("*** FAILED {} {}-{:02} ***: {}", vname, year, month, e);
                        log.finish(Outcome::Failed)?;
                        summary.failed.push(format!("{vname} {year}-{month:02}: {e}"));
                        counter!("seas5_downloads_failed_total", "vname" => vname.to_string()).increment(1);
                    }
                }
            }
        }

        info!(
            "Download finished: {} requested, {} completed, {} skipped, {} failed",
            summary.requested,
            summary.completed,
            summary.skipped,
            summary.failed.len()
        );
        Ok(summary)
    }
}
