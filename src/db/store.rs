//! Network store: persistence for computed networks and paper records.
//!
//! Two backends behind one trait, selected at construction:
//! - `MemoryStore` - process-local, lost on restart
//! - `FileStore` - one JSON document per entity under a data directory

use super::models::{CitationNetwork, NetworkSummary, NewNetwork, PaperRecord};
use crate::errors::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait NetworkStore: Send + Sync {
    /// Memoization lookup: a previously generated network for the exact
    /// `(root_doi, depth)` pair, or `None`.
    async fn find_network(
        &self,
        root_doi: &str,
        depth: usize,
    ) -> Result<Option<CitationNetwork>, AppError>;

    /// Persist a freshly generated network, assigning id and creation time.
    async fn save_network(&self, network: NewNetwork) -> Result<CitationNetwork, AppError>;

    async fn find_paper(&self, pmid: &str) -> Result<Option<PaperRecord>, AppError>;

    /// Idempotent: an existing record with the same pmid is returned
    /// unchanged rather than overwritten or duplicated.
    async fn save_paper(&self, record: PaperRecord) -> Result<PaperRecord, AppError>;

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, AppError>;
}

fn seal(network: NewNetwork) -> CitationNetwork {
    CitationNetwork {
        id: Uuid::new_v4(),
        root_doi: network.root_doi,
        depth: network.depth,
        nodes: network.nodes,
        edges: network.edges,
        stats: network.stats,
        created_at: Utc::now(),
    }
}

/// In-memory backend.
#[derive(Default)]
pub struct MemoryStore {
    networks: RwLock<HashMap<(String, usize), CitationNetwork>>,
    papers: RwLock<HashMap<String, PaperRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NetworkStore for MemoryStore {
    async fn find_network(
        &self,
        root_doi: &str,
        depth: usize,
    ) -> Result<Option<CitationNetwork>, AppError> {
        let networks = self.networks.read().await;
        Ok(networks.get(&(root_doi.to_string(), depth)).cloned())
    }

    async fn save_network(&self, network: NewNetwork) -> Result<CitationNetwork, AppError> {
        let sealed = seal(network);
        let mut networks = self.networks.write().await;
        networks.insert((sealed.root_doi.clone(), sealed.depth), sealed.clone());
        Ok(sealed)
    }

    async fn find_paper(&self, pmid: &str) -> Result<Option<PaperRecord>, AppError> {
        let papers = self.papers.read().await;
        Ok(papers.get(pmid).cloned())
    }

    async fn save_paper(&self, record: PaperRecord) -> Result<PaperRecord, AppError> {
        let mut papers = self.papers.write().await;
        if let Some(existing) = papers.get(&record.pmid) {
            return Ok(existing.clone());
        }
        papers.insert(record.pmid.clone(), record.clone());
        Ok(record)
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, AppError> {
        let networks = self.networks.read().await;
        let mut summaries: Vec<NetworkSummary> = networks.values().map(Into::into).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

/// Durable file backend. Directories are created lazily on first write;
/// network lookups scan the directory since DOIs do not make safe file names.
pub struct FileStore {
    networks_dir: PathBuf,
    papers_dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            networks_dir: dir.join("networks"),
            papers_dir: dir.join("papers"),
        }
    }

    fn io_err(context: &str, err: std::io::Error) -> AppError {
        AppError::StoreError(format!("{context}: {err}"))
    }

    async fn read_networks(&self) -> Result<Vec<CitationNetwork>, AppError> {
        let mut networks = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.networks_dir).await {
            Ok(entries) => entries,
            // Nothing persisted yet
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(networks),
            Err(err) => return Err(Self::io_err("failed to list networks", err)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_err("failed to list networks", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Self::io_err("failed to read network", e))?;
            let network: CitationNetwork = serde_json::from_str(&raw)
                .map_err(|e| AppError::StoreError(format!("corrupt network document: {e}")))?;
            networks.push(network);
        }
        Ok(networks)
    }

    fn paper_path(&self, pmid: &str) -> PathBuf {
        self.papers_dir.join(format!("{pmid}.json"))
    }
}

#[async_trait]
impl NetworkStore for FileStore {
    async fn find_network(
        &self,
        root_doi: &str,
        depth: usize,
    ) -> Result<Option<CitationNetwork>, AppError> {
        let networks = self.read_networks().await?;
        Ok(networks
            .into_iter()
            .find(|n| n.root_doi == root_doi && n.depth == depth))
    }

    async fn save_network(&self, network: NewNetwork) -> Result<CitationNetwork, AppError> {
        let sealed = seal(network);
        tokio::fs::create_dir_all(&self.networks_dir)
            .await
            .map_err(|e| Self::io_err("failed to create network directory", e))?;
        let payload = serde_json::to_string_pretty(&sealed)
            .map_err(|e| AppError::StoreError(format!("failed to encode network: {e}")))?;
        let path = self.networks_dir.join(format!("{}.json", sealed.id));
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| Self::io_err("failed to write network", e))?;
        Ok(sealed)
    }

    async fn find_paper(&self, pmid: &str) -> Result<Option<PaperRecord>, AppError> {
        match tokio::fs::read_to_string(self.paper_path(pmid)).await {
            Ok(raw) => {
                let record = serde_json::from_str(&raw)
                    .map_err(|e| AppError::StoreError(format!("corrupt paper document: {e}")))?;
                Ok(Some(record))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_err("failed to read paper", err)),
        }
    }

    async fn save_paper(&self, record: PaperRecord) -> Result<PaperRecord, AppError> {
        if let Some(existing) = self.find_paper(&record.pmid).await? {
            return Ok(existing);
        }
        tokio::fs::create_dir_all(&self.papers_dir)
            .await
            .map_err(|e| Self::io_err("failed to create paper directory", e))?;
        let payload = serde_json::to_string_pretty(&record)
            .map_err(|e| AppError::StoreError(format!("failed to encode paper: {e}")))?;
        tokio::fs::write(self.paper_path(&record.pmid), payload)
            .await
            .map_err(|e| Self::io_err("failed to write paper", e))?;
        Ok(record)
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, AppError> {
        let networks = self.read_networks().await?;
        let mut summaries: Vec<NetworkSummary> = networks.iter().map(Into::into).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
