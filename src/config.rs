use crate::constants::DEFAULT_CDS_URL;
use crate::error::{Result, Seas5Error};
use crate::variables::Variables;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "seas5tools.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cds: CdsConfig,
    #[serde(default)]
    pub variables: VariablesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdsConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_sleep_max_seconds")]
    pub sleep_max_seconds: u64,
}

impl Default for CdsConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            timeout_seconds: default_timeout_seconds(),
            sleep_max_seconds: default_sleep_max_seconds(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    6 * 60 * 60
}

fn default_sleep_max_seconds() -> u64 {
    120
}

#[derive(Debug, Default, Deserialize)]
pub struct VariablesConfig {
    #[serde(default)]
    pub long_names: BTreeMap<String, String>,
    #[serde(default)]
    pub grib_names: BTreeMap<String, String>,
}

/// Fully resolved CDS connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CdsSettings {
    pub url: String,
    pub key: String,
    pub timeout: Duration,
    pub sleep_max: Duration,
}

impl Config {
    /// Load from `path`, or from `seas5tools.toml` in the working directory
    /// when no path is given. A missing default file yields the defaults;
    /// a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !config_path.exists() {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            Seas5Error::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn variables(&self) -> Variables {
        Variables::with_overrides(&self.variables.long_names, &self.variables.grib_names)
    }

    /// Resolve URL and key: environment (`CDSAPI_URL`, `CDSAPI_KEY`) wins over
    /// the config file, which wins over `~/.cdsapirc`.
    pub fn cds_settings(&self) -> Result<CdsSettings> {
        let rc = home_dir()
            .map(|h| h.join(".cdsapirc"))
            .filter(|p| p.exists())
            .map(|p| fs::read_to_string(p).map(|s| parse_cdsapirc(&s)))
            .transpose()?
            .unwrap_or_default();

        self.resolve_with(
            std::env::var("CDSAPI_URL").ok(),
            std::env::var("CDSAPI_KEY").ok(),
            &rc,
        )
    }

    fn resolve_with(
        &self,
        env_url: Option<String>,
        env_key: Option<String>,
        rc: &Cdsapirc,
    ) -> Result<CdsSettings> {
        let url = env_url
            .or_else(|| self.cds.url.clone())
            .or_else(|| rc.url.clone())
            .unwrap_or_else(|| DEFAULT_CDS_URL.to_string());
        let key = env_key
            .or_else(|| self.cds.key.clone())
            .or_else(|| rc.key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Seas5Error::Config(
                    "No CDS API key: set CDSAPI_KEY, [cds] key, or ~/.cdsapirc".into(),
                )
            })?;
        Ok(CdsSettings {
            url: url.trim_end_matches('/').to_string(),
            key,
            timeout: Duration::from_secs(self.cds.timeout_seconds),
            sleep_max: Duration::from_secs(self.cds.sleep_max_seconds.max(1)),
        })
    }
}

/// Contents of a `.cdsapirc` file (`url: ...` and `key: ...` lines).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Cdsapirc {
    pub url: Option<String>,
    pub key: Option<String>,
}

pub fn parse_cdsapirc(content: &str) -> Cdsapirc {
    let mut rc = Cdsapirc::default();
    for line in content.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim() {
            "url" => rc.url = Some(value),
            "key" => rc.key = Some(value),
            _ => {}
        }
    }
    rc
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
