use crate::cds::SeasonalRequest;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a completed retrieval delivered to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub job_id: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Core trait for anything that can fetch a seasonal archive into a file
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve `request` from `dataset` and write the result to `target`.
    /// On error nothing is left at `target`.
    async fn retrieve(
        &self,
        dataset: &str,
        request: &SeasonalRequest,
        target: &Path,
    ) -> Result<Receipt>;
}
