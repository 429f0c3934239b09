use crate::cache::SummaryCache;
use crate::db::models::PaperRecord;
use crate::errors::AppError;
use crate::pubmed::{parse, PubMedApi};
use std::sync::Arc;

/// Metadata fetcher: durable cache in front of esummary, plus parsing.
pub struct MetadataService {
    api: Arc<dyn PubMedApi>,
    cache: SummaryCache,
}

impl MetadataService {
    pub fn new(api: Arc<dyn PubMedApi>, cache: SummaryCache) -> Self {
        Self { api, cache }
    }

    /// Raw summary payload for `pmid`. A cache hit returns immediately with
    /// no network call; a miss fetches and writes through best-effort.
    pub async fn fetch_raw(&self, pmid: &str) -> Result<String, AppError> {
        if let Some(cached) = self.cache.get(pmid).await {
            metrics::counter!("citegraph_summary_cache_hits_total").increment(1);
            return Ok(cached);
        }
        metrics::counter!("citegraph_summary_cache_misses_total").increment(1);

        let payload = self.api.fetch_summary(pmid).await?;
        if let Err(err) = self.cache.put(pmid, &payload).await {
            tracing::warn!(pmid, error = %err, "Failed to cache summary, continuing without cache");
        }
        Ok(payload)
    }

    pub async fn fetch_record(&self, pmid: &str) -> Result<PaperRecord, AppError> {
        let raw = self.fetch_raw(pmid).await?;
        parse::parse_summary(pmid, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubmed::testing::{summary_payload, StubApi};

    fn service(api: StubApi, dir: &tempfile::TempDir) -> (MetadataService, Arc<StubApi>) {
        let api = Arc::new(api);
        let service = MetadataService::new(api.clone(), SummaryCache::new(dir.path()));
        (service, api)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let (service, api) = service(StubApi::new().with_paper("100", "First"), &dir);

        let payload = service.fetch_raw("100").await.unwrap();
        assert_eq!(payload, summary_payload("100", "First"));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_hit_is_byte_identical_with_zero_network_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (service, api) = service(StubApi::new().with_paper("100", "First"), &dir);

        let first = service.fetch_raw("100").await.unwrap();
        let second = service.fetch_raw("100").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(api.call_count(), 1, "second fetch must be served from cache");
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(StubApi::new(), &dir);
        assert!(matches!(
            service.fetch_raw("100").await,
            Err(AppError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_record_parses() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(StubApi::new().with_paper("100", "A Title"), &dir);

        let record = service.fetch_record("100").await.unwrap();
        assert_eq!(record.pmid, "100");
        assert_eq!(record.title, "A Title");
        assert_eq!(record.citation_count, 3);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(StubApi::new().with_raw_summary("100", "not json"), &dir);
        assert!(matches!(
            service.fetch_record("100").await,
            Err(AppError::ParseFailure(_))
        ));
    }
}
