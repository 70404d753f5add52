//! Listing of downloaded GRIB files in an output directory.

use crate::error::{Result, Seas5Error};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct InventoryEntry {
    pub vname: String,
    pub year: i32,
    pub month: u32,
    pub path: PathBuf,
}

static FILE_PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn file_pattern() -> Result<&'static Regex> {
    FILE_PATTERN
        .get_or_init(|| Regex::new(r"^([A-Za-z0-9]+)_(\d{4})_(\d{2})\.grib$"))
        .as_ref()
        .map_err(|e| Seas5Error::Config(format!("invalid file pattern: {e}")))
}

/// Split a `{vname}_{YYYY}_{MM}.grib` file name into its parts; `None` for
/// any other name.
pub fn parse_file_name(name: &str) -> Result<Option<(String, i32, u32)>> {
    let re = file_pattern()?;
    let parsed = re.captures(name).and_then(|caps| {
        let year = caps[2].parse().ok()?;
        let month: u32 = caps[3].parse().ok()?;
        (1..=12)
            .contains(&month)
            .then(|| (caps[1].to_string(), year, month))
    });
    Ok(parsed)
}

/// Every `{vname}_{YYYY}_{MM}.grib` file in `dir`, optionally limited to one
/// variable, sorted by variable, year and month. Partial downloads and other
/// files are ignored.
pub fn scan(dir: &Path, vname: Option<&str>) -> Result<Vec<InventoryEntry>> {
    if !dir.is_dir() {
        return Err(Seas5Error::MissingFile(dir.to_path_buf()));
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some((v, year, month)) = parse_file_name(name)? else {
            continue;
        };
        if vname.is_some_and(|want| want != v) {
            continue;
        }
        entries.push(InventoryEntry {
            vname: v,
            year,
            month,
            path: entry.path(),
        });
    }
    entries.sort();
    Ok(entries)
}
