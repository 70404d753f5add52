use anyhow::{bail, Context};
use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use seas5tools::cds::CdsClient;
use seas5tools::config::Config;
use seas5tools::convert::BoundingBox;
use seas5tools::download::{DownloadOptions, Downloader};
use seas5tools::pipeline::{Pipeline, ProcessOptions};
use seas5tools::{inventory, logging, storage};

#[derive(Parser)]
#[command(name = "seas5tools")]
#[command(about = "Download and process ECMWF SEAS5 seasonal forecasts")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./seas5tools.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling JSON log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: String,

    #[command(subcommand)]
    command: Commands,
}

/// Year and archive selection shared by `download` and `process`
#[derive(Args, Debug, Clone)]
struct YearArgs {
    /// First initialisation year
    #[arg(long = "from")]
    from_year: Option<i32>,
    /// Last initialisation year
    #[arg(long = "to")]
    to_year: Option<i32>,
    /// Include hindcast years (1981-2016)
    #[arg(long)]
    hindcast: bool,
    /// Exclude forecast years (2017 onwards)
    #[arg(long)]
    no_forecast: bool,
}

impl YearArgs {
    fn range(&self, this_year: i32) -> Option<(i32, i32)> {
        match (self.from_year, self.to_year) {
            (None, None) => None,
            (from, to) => Some((
                from.unwrap_or(seas5tools::constants::HINDCAST_FIRST_YEAR),
                to.unwrap_or(this_year),
            )),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download monthly statistics from the Climate Data Store
    Download {
        /// Variable name (pre, tmax, tmin, sst)
        vname: String,
        /// Output directory for GRIB files and download logs
        outpath: PathBuf,
        /// Single initialisation year
        #[arg(long, conflicts_with_all = ["from_year", "to_year"])]
        year: Option<i32>,
        /// Single initialisation month
        #[arg(long, conflicts_with = "months", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Comma-separated initialisation months (defaults to all twelve)
        #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u32).range(1..=12))]
        months: Option<Vec<u32>>,
        #[command(flatten)]
        years: YearArgs,
        /// Re-fetch files that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Convert downloaded GRIB files for one month into a Zarr store
    Process {
        /// Variable name (pre, tmax, tmin, sst)
        vname: String,
        /// Directory holding {vname}_{YYYY}_{MM}.grib files
        inpath: PathBuf,
        /// Initialisation month
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        /// Output Zarr directory
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        years: YearArgs,
        #[arg(long, allow_hyphen_values = true)]
        lat_min: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lat_max: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon_min: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon_max: Option<f64>,
        /// Warn and continue when a year's file is absent
        #[arg(long)]
        skip_missing: bool,
    },
    /// Summarise a Zarr store written by `process`
    Inspect {
        zarr: PathBuf,
    },
    /// List downloaded GRIB files in a directory
    List {
        dir: PathBuf,
        /// Only list this variable
        #[arg(long)]
        vname: Option<String>,
    },
    /// Show the configured variable names
    Variables,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let variables = config.variables();
    let today = Local::now().date_naive();
    let this_year = today.year();

    match cli.command {
        Commands::Download {
            vname,
            outpath,
            year,
            month,
            months,
            years,
            overwrite,
        } => {
            println!("📥 Downloading {} to {}", vname, outpath.display());

            // No selection at all means the current initialisation month
            let nothing_selected = year.is_none()
                && month.is_none()
                && months.is_none()
                && years.range(this_year).is_none();
            let (year_range, months) = if nothing_selected {
                (Some((this_year, this_year)), Some(vec![today.month()]))
            } else {
                (
                    year.map(|y| (y, y)).or_else(|| years.range(this_year)),
                    month.map(|m| vec![m]).or(months),
                )
            };
            let options = DownloadOptions {
                year_range,
                months,
                hindcast: years.hindcast,
                forecast: !years.no_forecast,
                overwrite,
            };

            let client = CdsClient::new(config.cds_settings()?)?;
            let downloader = Downloader::new(Arc::new(client), variables);
            let summary = downloader
                .download(&vname, &outpath, &options, this_year)
                .await?;

            println!("\n📊 Download results for {}:", vname);
            println!("   Requested: {}", summary.requested);
            println!("   Completed: {}", summary.completed);
            println!("   Skipped: {}", summary.skipped);
            println!("   Failed: {}", summary.failed.len());
            if !summary.failed.is_empty() {
                warn!("{} downloads failed", summary.failed.len());
                println!("\n⚠️  Failures:");
                for failure in &summary.failed {
                    println!("   - {}", failure);
                }
            }
        }
        Commands::Process {
            vname,
            inpath,
            month,
            output,
            years,
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            skip_missing,
        } => {
            println!("🔨 Processing {} month {:02} from {}", vname, month, inpath.display());
            let options = ProcessOptions {
                year_range: years.range(this_year),
                hindcast: years.hindcast,
                forecast: !years.no_forecast,
                bbox: BoundingBox {
                    lat: (lat_min, lat_max),
                    lon: (lon_min, lon_max),
                },
                skip_missing,
            };

            let pipeline = Pipeline::new(variables);
            let dataset = match pipeline.process(&inpath, &vname, month, &options, this_year) {
                Ok(dataset) => dataset,
                Err(e) => {
                    error!("Processing failed: {}", e);
                    println!("❌ Processing failed: {}", e);
                    return Err(e.into());
                }
            };
            storage::write_zarr(&dataset, &output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("Processing complete");
            println!("✅ Wrote {:?} to {}", dataset.mean.shape(), output.display());
        }
        Commands::Inspect { zarr } => {
            let summary = storage::inspect(&zarr)?;
            println!("{}", serde_json::to_string_pretty(&summary.attributes)?);
            for (name, shape) in &summary.arrays {
                println!("   {:<10} {:?}", name, shape);
            }
        }
        Commands::List { dir, vname } => {
            let entries = inventory::scan(&dir, vname.as_deref())?;
            if entries.is_empty() {
                bail!("no GRIB files found in {}", dir.display());
            }
            for entry in &entries {
                println!("{} {}-{:02}  {}", entry.vname, entry.year, entry.month, entry.path.display());
            }
            println!("\n{} files", entries.len());
        }
        Commands::Variables => {
            for vname in variables.names() {
                let long_name = variables.long_name(&vname).unwrap_or("-");
                let grib_name = variables.grib_name(&vname).unwrap_or("-");
                println!("{:<6} {:<45} {}", vname, long_name, grib_name);
            }
        }
    }
    Ok(())
}
