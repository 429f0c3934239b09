use crate::db::models::PaperRecord;
use crate::db::store::NetworkStore;
use crate::errors::AppError;
use crate::services::metadata::MetadataService;
use std::sync::Arc;

/// Paper lookups: store first, then a live fetch+parse persisted through the
/// idempotent `save_paper`.
pub struct PaperService {
    metadata: Arc<MetadataService>,
    store: Arc<dyn NetworkStore>,
}

impl PaperService {
    pub fn new(metadata: Arc<MetadataService>, store: Arc<dyn NetworkStore>) -> Self {
        Self { metadata, store }
    }

    pub async fn get(&self, pmid: &str) -> Result<PaperRecord, AppError> {
        if let Some(record) = self.store.find_paper(pmid).await? {
            return Ok(record);
        }

        match self.metadata.fetch_record(pmid).await {
            Ok(record) => self.store.save_paper(record).await,
            // esummary answers unknown ids with a per-document error, which
            // surfaces as a parse failure; at this boundary it means 404.
            Err(AppError::ParseFailure(_)) => Err(AppError::PaperNotFound {
                pmid: pmid.to_string(),
            }),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SummaryCache;
    use crate::db::store::MemoryStore;
    use crate::pubmed::testing::StubApi;
    use crate::pubmed::PubMedApi;

    fn service(api: StubApi) -> (PaperService, Arc<StubApi>, Arc<MemoryStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(api);
        let dyn_api: Arc<dyn PubMedApi> = api.clone();
        let store = Arc::new(MemoryStore::new());
        let metadata = Arc::new(MetadataService::new(dyn_api, SummaryCache::new(dir.path())));
        (
            PaperService::new(metadata, store.clone()),
            api,
            store,
            dir,
        )
    }

    #[tokio::test]
    async fn test_stored_paper_skips_upstream() {
        let (service, api, store, _dir) = service(StubApi::new());
        store
            .save_paper(PaperRecord {
                pmid: "100".into(),
                doi: None,
                title: "Stored".into(),
                authors: vec![],
                journal: None,
                year: None,
                abstract_text: None,
                citation_count: 0,
            })
            .await
            .unwrap();

        let record = service.get("100").await.unwrap();
        assert_eq!(record.title, "Stored");
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_live_fetch_is_persisted() {
        let (service, _, store, _dir) = service(StubApi::new().with_paper("100", "Live"));

        let record = service.get("100").await.unwrap();
        assert_eq!(record.title, "Live");
        assert!(store.find_paper("100").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let raw = r#"{"result":{"uids":["999"],"999":{"uid":"999","error":"cannot get document summary"}}}"#;
        let (service, _, _, _dir) = service(StubApi::new().with_raw_summary("999", raw));

        let err = service.get("999").await.unwrap_err();
        assert!(matches!(err, AppError::PaperNotFound { .. }));
    }

    #[tokio::test]
    async fn test_upstream_outage_is_not_a_404() {
        let (service, _, _, _dir) = service(StubApi::new());
        let err = service.get("100").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
