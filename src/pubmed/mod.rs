//! PubMed E-utilities integration
//!
//! `PubMedApi` is the upstream contract the engine consumes: identifier
//! search, summary retrieval, and forward-link discovery. All three are
//! fallible, latent, and rate-limited; `EutilsClient` is the production
//! implementation and tests substitute their own.

pub mod client;
pub mod parse;

pub use client::EutilsClient;

use crate::errors::AppError;
use async_trait::async_trait;

/// The two link relations the traversal walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Papers citing the given one (elink `pubmed_pubmed_citedin`).
    Citing,
    /// Related papers (elink `pubmed_pubmed`).
    Related,
}

impl LinkKind {
    pub fn linkname(&self) -> &'static str {
        match self {
            LinkKind::Citing => "pubmed_pubmed_citedin",
            LinkKind::Related => "pubmed_pubmed",
        }
    }
}

#[async_trait]
pub trait PubMedApi: Send + Sync {
    /// esearch: PMIDs matching a query term, in upstream relevance order.
    async fn search(&self, term: &str) -> Result<Vec<String>, AppError>;

    /// esummary: the raw response payload for one PMID, byte-exact. Parsing
    /// is a separate concern (`parse::parse_summary`) so the cache can hold
    /// the payload untouched.
    async fn fetch_summary(&self, pmid: &str) -> Result<String, AppError>;

    /// elink: neighbor PMIDs for one relation, in upstream order.
    async fn links(&self, pmid: &str, kind: LinkKind) -> Result<Vec<String>, AppError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linknames() {
        assert_eq!(LinkKind::Citing.linkname(), "pubmed_pubmed_citedin");
        assert_eq!(LinkKind::Related.linkname(), "pubmed_pubmed");
    }
}
