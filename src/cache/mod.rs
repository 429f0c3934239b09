//! Durable summary cache
//!
//! One file per PMID holding the exact raw upstream payload, no expiry.
//! Staleness is an accepted tradeoff; there is no invalidation path. The
//! directory is created lazily on first write, and concurrent writers for the
//! same id are tolerated (idempotent content, last write wins).

use crate::errors::AppError;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SummaryCache {
    dir: PathBuf,
}

impl SummaryCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, pmid: &str) -> PathBuf {
        self.dir.join(format!("{pmid}.json"))
    }

    /// Cached payload for `pmid`, byte-identical to what was stored.
    /// Any read failure is treated as a miss.
    pub async fn get(&self, pmid: &str) -> Option<String> {
        match tokio::fs::read_to_string(self.path(pmid)).await {
            Ok(payload) => {
                debug!(pmid, "Summary cache hit");
                Some(payload)
            }
            Err(_) => {
                debug!(pmid, "Summary cache miss");
                None
            }
        }
    }

    /// Write a payload through to disk. Callers treat a failure as
    /// best-effort (logged, never propagated): a full or broken cache disk
    /// must not fail the fetch that produced the payload.
    pub async fn put(&self, pmid: &str, payload: &str) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::CacheError(format!("failed to create cache directory: {e}")))?;
        tokio::fs::write(self.path(pmid), payload)
            .await
            .map_err(|e| AppError::CacheError(format!("failed to write summary for {pmid}: {e}")))?;
        Ok(())
    }
}
