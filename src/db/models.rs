//! Core data model: paper records, network nodes/edges, and stored networks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bibliographic record, created on first successful fetch+parse and
/// immutable afterwards. Owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperRecord {
    /// PubMed id - the internal identifier used for all upstream lookups.
    pub pmid: String,
    pub doi: Option<String>,
    pub title: String,
    /// Author display names, in upstream order.
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub citation_count: u32,
}

/// A paper projected into the graph view, with its traversal level.
///
/// `level` is the minimal depth at which the id was reached from the root
/// (first-resolved depth in interleaved mode). Consumers must key off `level`,
/// never off position in the node list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkNode {
    pub pmid: String,
    pub doi: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub citation_count: u32,
    pub level: usize,
}

impl NetworkNode {
    pub fn from_record(record: PaperRecord, level: usize) -> Self {
        Self {
            pmid: record.pmid,
            doi: record.doi,
            title: record.title,
            authors: record.authors,
            journal: record.journal,
            year: record.year,
            abstract_text: record.abstract_text,
            citation_count: record.citation_count,
            level,
        }
    }
}

/// Edge relation kind.
///
/// Edges found through the "citing" relation point from the discovered
/// neighbor into the node being expanded and carry `Cites`; edges found
/// through the "related" relation point from the expanded node to the
/// neighbor and carry `CitedBy`. The asymmetry is inherited from the upstream
/// link semantics and is intentionally not normalized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Cites,
    CitedBy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl NetworkEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

/// Aggregate metadata attached to a generated network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub elapsed_ms: u64,
    pub depth: usize,
}

/// A network as assembled by the graph builder, before the store assigns
/// identity.
#[derive(Debug, Clone)]
pub struct NewNetwork {
    pub root_doi: String,
    pub depth: usize,
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub stats: NetworkStats,
}

/// A persisted citation network, keyed by `(root_doi, depth)` for
/// memoization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitationNetwork {
    pub id: Uuid,
    pub root_doi: String,
    pub depth: usize,
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub stats: NetworkStats,
    pub created_at: DateTime<Utc>,
}

/// Listing projection for `GET /networks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub id: Uuid,
    pub root_doi: String,
    pub depth: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&CitationNetwork> for NetworkSummary {
    fn from(network: &CitationNetwork) -> Self {
        Self {
            id: network.id,
            root_doi: network.root_doi.clone(),
            depth: network.depth,
            node_count: network.stats.node_count,
            edge_count: network.stats.edge_count,
            created_at: network.created_at,
        }
    }
}
