use crate::cds::SeasonalRequest;
use crate::config::CdsSettings;
use crate::error::{Result, Seas5Error};
use crate::types::{Receipt, Retriever};
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
    #[serde(rename = "file:size")]
    size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct Problem {
    title: Option<String>,
    detail: Option<String>,
}

/// Client for the CDS retrieve API: submit a job, poll it, download the asset.
pub struct CdsClient {
    http: reqwest::Client,
    settings: CdsSettings,
    sleep_start: Duration,
}

impl CdsClient {
    pub fn new(settings: CdsSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("seas5tools/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            settings,
            sleep_start: Duration::from_secs(1),
        })
    }

    /// First poll delay; later delays grow by half up to `sleep_max`.
    pub fn with_initial_sleep(mut self, sleep: Duration) -> Self {
        self.sleep_start = sleep;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/retrieve/v1/{}", self.settings.url, path)
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let problem: Problem = serde_json::from_str(&body).unwrap_or_default();
        let message = match (problem.title, problem.detail) {
            (Some(title), Some(detail)) => format!("{status}: {title}: {detail}"),
            (Some(title), None) => format!("{status}: {title}"),
            (None, Some(detail)) => format!("{status}: {detail}"),
            (None, None) if !body.is_empty() => format!("{status}: {body}"),
            (None, None) => status.to_string(),
        };
        Err(Seas5Error::Api { message })
    }

    pub async fn submit(&self, dataset: &str, request: &SeasonalRequest) -> Result<String> {
        let url = self.endpoint(&format!("processes/{dataset}/execution"));
        let resp = self
            .http
            .post(&url)
            .header(TOKEN_HEADER, &self.settings.key)
            .json(&json!({ "inputs": request }))
            .send()
            .await?;
        let job: JobStatus = Self::check(resp).await?.json().await?;
        info!("Request accepted as job {} ({})", job.job_id, job.status);
        Ok(job.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.endpoint(&format!("jobs/{job_id}")))
            .header(TOKEN_HEADER, &self.settings.key)
            .send()
            .await?;
        let job: JobStatus = Self::check(resp).await?.json().await?;
        Ok(job.status)
    }

    /// Poll until the job succeeds, fails, or the configured timeout passes.
    pub async fn wait(&self, job_id: &str) -> Result<()> {
        let started = Instant::now();
        let mut sleep = self.sleep_start;
        loop {
            let status = self.status(job_id).await?;
            match status.as_str() {
                "successful" => return Ok(()),
                "failed" | "rejected" | "dismissed" => {
                    return Err(Seas5Error::JobFailed {
                        job_id: job_id.to_string(),
                        status,
                    })
                }
                other => debug!("Job {} is {}", job_id, other),
            }
            if started.elapsed() + sleep > self.settings.timeout {
                return Err(Seas5Error::Timeout(job_id.to_string()));
            }
            tokio::time::sleep(sleep).await;
            sleep = sleep.mul_f64(1.5).min(self.settings.sleep_max);
        }
    }

    async fn asset_href(&self, job_id: &str) -> Result<(Url, Option<u64>)> {
        let resp = self
            .http
            .get(self.endpoint(&format!("jobs/{job_id}/results")))
            .header(TOKEN_HEADER, &self.settings.key)
            .send()
            .await?;
        let results: JobResults = Self::check(resp).await?.json().await?;
        let base = Url::parse(&format!("{}/", self.settings.url)).map_err(|e| Seas5Error::Api {
            message: format!("Invalid CDS url '{}': {}", self.settings.url, e),
        })?;
        let href = base.join(&results.asset.value.href).map_err(|e| Seas5Error::Api {
            message: format!("Invalid asset href '{}': {}", results.asset.value.href, e),
        })?;
        Ok((href, results.asset.value.size))
    }

    /// Stream `href` into `target` via a `.part` file, hashing as it goes.
    async fn download(&self, href: Url, target: &Path) -> Result<(u64, String)> {
        let part = part_path(target);
        let result = self.stream_to(href, &part).await;
        match result {
            Ok(done) => {
                tokio::fs::rename(&part, target).await?;
                Ok(done)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, href: Url, part: &Path) -> Result<(u64, String)> {
        let resp = self.http.get(href).send().await?;
        let mut resp = Self::check(resp).await?;
        let mut file = tokio::fs::File::create(part).await?;
        let mut hasher = Sha256::new();
        let mut bytes: u64 = 0;
        while let Some(chunk) = resp.chunk().await? {
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok((bytes, hex::encode(hasher.finalize())))
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

#[async_trait::async_trait]
impl Retriever for CdsClient {
    #[instrument(skip(self, request), fields(target = %target.display()))]
    async fn retrieve(
        &self,
        dataset: &str,
        request: &SeasonalRequest,
        target: &Path,
    ) -> Result<Receipt> {
        let job_id = self.submit(dataset, request).await?;
        self.wait(&job_id).await?;
        let (href, size) = self.asset_href(&job_id).await?;
        let (bytes, sha256) = self.download(href, target).await?;
        if let Some(expected) = size {
            if expected != bytes {
                warn!("Asset size {} differs from advertised {}", bytes, expected);
            }
        }
        info!("Downloaded {} bytes for job {}", bytes, job_id);
        Ok(Receipt {
            job_id,
            bytes,
            sha256,
        })
    }
}
