use crate::pubmed::{LinkKind, PubMedApi};
use std::sync::Arc;
use tracing::warn;

/// Link discovery over elink.
///
/// Failures degrade to an empty list by design: the traversal must tolerate
/// empty results from any node without distinguishing "no links" from
/// "lookup failed".
pub struct LinkService {
    api: Arc<dyn PubMedApi>,
    limit: usize,
}

impl LinkService {
    pub fn new(api: Arc<dyn PubMedApi>, limit: usize) -> Self {
        Self { api, limit }
    }

    /// Papers citing `pmid`, truncated to the configured limit.
    pub async fn citing(&self, pmid: &str) -> Vec<String> {
        self.discover(pmid, LinkKind::Citing).await
    }

    /// Papers related to `pmid`, truncated to the configured limit.
    pub async fn related(&self, pmid: &str) -> Vec<String> {
        self.discover(pmid, LinkKind::Related).await
    }

    async fn discover(&self, pmid: &str, kind: LinkKind) -> Vec<String> {
        match self.api.links(pmid, kind).await {
            Ok(mut ids) => {
                ids.truncate(self.limit);
                ids
            }
            Err(err) => {
                warn!(pmid, kind = ?kind, error = %err, "Link discovery failed, treating as no links");
                Vec::new()
            }
        }
    }
}
