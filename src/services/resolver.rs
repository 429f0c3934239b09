use crate::errors::AppError;
use crate::pubmed::PubMedApi;
use std::sync::Arc;
use tracing::debug;

/// Maps an external persistent identifier (DOI) to the internal PMID used
/// for all subsequent lookups.
pub struct Resolver {
    api: Arc<dyn PubMedApi>,
}

impl Resolver {
    pub fn new(api: Arc<dyn PubMedApi>) -> Self {
        Self { api }
    }

    /// One esearch round trip. Zero matches and a failed lookup stay
    /// distinguishable: the former is `DoiNotFound`, the latter `Upstream`.
    pub async fn resolve(&self, doi: &str) -> Result<String, AppError> {
        let term = format!("\"{doi}\"[doi]");
        let ids = self.api.search(&term).await?;
        match ids.into_iter().next() {
            Some(pmid) => {
                debug!(doi, pmid, "Resolved DOI");
                Ok(pmid)
            }
            None => Err(AppError::DoiNotFound { doi: doi.to_string() }),
        }
    }
}
