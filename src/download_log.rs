use crate::constants::{DOWNLOAD_LOG, DOWNLOAD_MANIFEST};
use crate::error::Result;
use crate::types::Receipt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Outcome written after a `Processing ...` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Skipped,
    Failed,
}

impl Outcome {
    fn as_log_str(&self) -> &'static str {
        match self {
            Outcome::Complete => "Complete",
            Outcome::Skipped => "Skipped",
            Outcome::Failed => "*** FAILED ***",
        }
    }
}

/// One line of `downloads.ndjson`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub vname: String,
    pub year: i32,
    pub month: u32,
    pub file: String,
    pub job_id: String,
    pub bytes: u64,
    pub sha256: String,
    pub downloaded_at: DateTime<Utc>,
}

/// Plain-text progress log plus a JSON-lines manifest of completed files,
/// both kept in the download directory so a failed batch can be resumed.
pub struct DownloadLog {
    log_path: PathBuf,
    manifest_path: PathBuf,
    log: File,
}

impl DownloadLog {
    /// Open (creating with a `Logfile` header if needed) the log in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let log_path = dir.join(DOWNLOAD_LOG);
        if !log_path.exists() {
            fs::write(&log_path, "Logfile\n")?;
        }
        let log = OpenOptions::new().append(true).open(&log_path)?;
        Ok(Self {
            log_path,
            manifest_path: dir.join(DOWNLOAD_MANIFEST),
            log,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn begin(&mut self, vname: &str, year: i32, month: u32) -> Result<()> {
        write!(self.log, "Processing {vname} {year}-{month:02}...")?;
        self.log.flush()?;
        Ok(())
    }

    pub fn finish(&mut self, outcome: Outcome) -> Result<()> {
        writeln!(self.log, "{}", outcome.as_log_str())?;
        self.log.flush()?;
        Ok(())
    }

    pub fn record(&self, vname: &str, year: i32, month: u32, file: &str, receipt: &Receipt) -> Result<()> {
        let entry = ManifestEntry {
            vname: vname.to_string(),
            year,
            month,
            file: file.to_string(),
            job_id: receipt.job_id.clone(),
            bytes: receipt.bytes,
            sha256: receipt.sha256.clone(),
            downloaded_at: Utc::now(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.manifest_path)?;
        let line = serde_json::to_string(&entry)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Read every entry of a manifest; a missing file reads as empty.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}
