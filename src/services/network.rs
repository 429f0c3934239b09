//! Graph builder: bounded-depth citation network traversal.
//!
//! Composes the resolver, metadata fetcher, and link discovery into a
//! node/edge graph with level assignment, dedup, and whole-network
//! memoization against the store. Two traversal strategies are supported:
//!
//! - **Staged** (default): phase 1 walks links only and computes true
//!   minimal levels, phase 2 fetches summaries in fixed-size batches,
//!   phase 3 parses and assembles. Deterministic levels, bounded fetch
//!   concurrency.
//! - **Interleaved**: each node's metadata is fetched eagerly as it is
//!   discovered and the recursion continues immediately. Lower
//!   time-to-first-result; levels reflect whichever discovery path won the
//!   check-and-mark race.

use crate::config::{GraphConfig, TraversalMode};
use crate::db::models::{
    CitationNetwork, EdgeKind, NetworkEdge, NetworkNode, NetworkStats, NewNetwork,
};
use crate::db::store::NetworkStore;
use crate::errors::AppError;
use crate::pubmed::parse;
use crate::services::links::LinkService;
use crate::services::metadata::MetadataService;
use crate::services::resolver::Resolver;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct NetworkService {
    resolver: Arc<Resolver>,
    metadata: Arc<MetadataService>,
    links: Arc<LinkService>,
    store: Arc<dyn NetworkStore>,
    config: GraphConfig,
}

/// Shared state of one interleaved traversal. Sibling branches run
/// concurrently on a multi-threaded runtime, so check-visited / insert /
/// record-level must happen under a single lock acquisition with no await
/// point inside.
#[derive(Default)]
struct TraversalState {
    visited: Mutex<HashSet<String>>,
    nodes: Mutex<Vec<NetworkNode>>,
    edges: Mutex<Vec<NetworkEdge>>,
}

impl TraversalState {
    /// Atomic check-and-mark. Returns false when `id` already holds its
    /// dedup slot.
    async fn try_mark(&self, id: &str) -> bool {
        self.visited.lock().await.insert(id.to_string())
    }

    async fn is_visited(&self, id: &str) -> bool {
        self.visited.lock().await.contains(id)
    }
}

impl NetworkService {
    pub fn new(
        resolver: Arc<Resolver>,
        metadata: Arc<MetadataService>,
        links: Arc<LinkService>,
        store: Arc<dyn NetworkStore>,
        config: GraphConfig,
    ) -> Self {
        Self {
            resolver,
            metadata,
            links,
            store,
            config,
        }
    }

    /// Generate (or recall) the citation network rooted at `doi`.
    ///
    /// Only root resolution failure aborts; per-node fetch/parse failures
    /// omit the node and continue, so a partial network is a valid success.
    pub async fn generate(&self, doi: &str, depth: usize) -> Result<CitationNetwork, AppError> {
        if let Some(existing) = self.store.find_network(doi, depth).await? {
            info!(doi, depth, "Serving memoized network");
            metrics::counter!("citegraph_network_memo_hits_total").increment(1);
            return Ok(existing);
        }

        let started = Instant::now();
        let root = self.resolver.resolve(doi).await?;
        info!(doi, root, depth, mode = ?self.config.mode, "Generating citation network");

        let (nodes, edges) = match self.config.mode {
            TraversalMode::Staged => self.traverse_staged(&root, depth).await,
            TraversalMode::Interleaved => self.traverse_interleaved(&root, depth).await,
        };

        // Post-filter: only edges whose both endpoints survived into the
        // node list are kept.
        let surviving: HashSet<&str> = nodes.iter().map(|n| n.pmid.as_str()).collect();
        let edges: Vec<NetworkEdge> = edges
            .into_iter()
            .filter(|e| surviving.contains(e.source.as_str()) && surviving.contains(e.target.as_str()))
            .collect();

        let stats = NetworkStats {
            node_count: nodes.len(),
            edge_count: edges.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            depth,
        };
        let network = self
            .store
            .save_network(NewNetwork {
                root_doi: doi.to_string(),
                depth,
                nodes,
                edges,
                stats,
            })
            .await?;

        metrics::counter!("citegraph_networks_generated_total").increment(1);
        info!(
            doi,
            nodes = network.stats.node_count,
            edges = network.stats.edge_count,
            elapsed_ms = network.stats.elapsed_ms,
            "Citation network generated"
        );
        Ok(network)
    }

    /// Staged traversal: links first, metadata afterwards.
    async fn traverse_staged(
        &self,
        root: &str,
        max_depth: usize,
    ) -> (Vec<NetworkNode>, Vec<NetworkEdge>) {
        // Phase 1: pure link traversal. Level-synchronous BFS makes every
        // recorded level the true minimum over all discovery paths.
        let mut visited: HashSet<String> = HashSet::new();
        let mut levels: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut edges: Vec<NetworkEdge> = Vec::new();

        visited.insert(root.to_string());
        levels.insert(root.to_string(), 0);
        order.push(root.to_string());
        let mut frontier = vec![root.to_string()];

        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }

            let discoveries = join_all(frontier.iter().map(|id| async move {
                let (citing, related) =
                    tokio::join!(self.links.citing(id), self.links.related(id));
                (id.clone(), citing, related)
            }))
            .await;

            let mut next = Vec::new();
            for (id, citing, related) in discoveries {
                for neighbor in citing {
                    if !visited.insert(neighbor.clone()) {
                        continue;
                    }
                    levels.insert(neighbor.clone(), depth + 1);
                    edges.push(NetworkEdge::new(neighbor.clone(), id.clone(), EdgeKind::Cites));
                    order.push(neighbor.clone());
                    next.push(neighbor);
                }
                for neighbor in related {
                    if !visited.insert(neighbor.clone()) {
                        continue;
                    }
                    levels.insert(neighbor.clone(), depth + 1);
                    edges.push(NetworkEdge::new(id.clone(), neighbor.clone(), EdgeKind::CitedBy));
                    order.push(neighbor.clone());
                    next.push(neighbor);
                }
            }
            frontier = next;
        }

        // Phase 2: fetch raw summaries in fixed-size batches. Full
        // parallelism within a batch, batches sequential.
        let mut raw: HashMap<String, String> = HashMap::new();
        let batch_size = self.config.batch_size.max(1);
        for batch in order.chunks(batch_size) {
            let fetched = join_all(
                batch
                    .iter()
                    .map(|id| async move { (id.clone(), self.metadata.fetch_raw(id).await) }),
            )
            .await;
            for (id, result) in fetched {
                match result {
                    Ok(payload) => {
                        raw.insert(id, payload);
                    }
                    Err(err) => {
                        warn!(pmid = %id, error = %err, "Summary fetch failed, node will be omitted")
                    }
                }
            }
        }

        // Phase 3: parse everything; only successfully parsed ids survive.
        let mut nodes = Vec::new();
        for id in &order {
            let Some(payload) = raw.get(id) else { continue };
            match parse::parse_summary(id, payload) {
                Ok(record) => {
                    if let Err(err) = self.store.save_paper(record.clone()).await {
                        warn!(pmid = %id, error = %err, "Failed to persist paper record");
                    }
                    let level = levels.get(id).copied().unwrap_or(0);
                    nodes.push(NetworkNode::from_record(record, level));
                }
                Err(err) => {
                    warn!(pmid = %id, error = %err, "Skipping node with unusable metadata")
                }
            }
        }

        (nodes, edges)
    }

    /// Interleaved traversal: recursive fan-out with eager metadata fetch.
    async fn traverse_interleaved(
        &self,
        root: &str,
        max_depth: usize,
    ) -> (Vec<NetworkNode>, Vec<NetworkEdge>) {
        let state = TraversalState::default();
        self.process(&state, root.to_string(), 0, max_depth).await;
        (state.nodes.into_inner(), state.edges.into_inner())
    }

    fn process<'a>(
        &'a self,
        state: &'a TraversalState,
        id: String,
        depth: usize,
        max_depth: usize,
    ) -> BoxFuture<'a, ()> {
        async move {
            if depth > max_depth || !state.try_mark(&id).await {
                return;
            }

            match self.metadata.fetch_record(&id).await {
                Ok(record) => {
                    if let Err(err) = self.store.save_paper(record.clone()).await {
                        warn!(pmid = %id, error = %err, "Failed to persist paper record");
                    }
                    state
                        .nodes
                        .lock()
                        .await
                        .push(NetworkNode::from_record(record, depth));
                }
                // The id keeps its dedup slot: no node is emitted and it is
                // not retried within this traversal.
                Err(err) => {
                    warn!(pmid = %id, error = %err, "Skipping node with unusable metadata")
                }
            }

            if depth == max_depth {
                // Leaf: no link discovery.
                return;
            }

            let (citing, related) = tokio::join!(self.links.citing(&id), self.links.related(&id));

            let mut children: Vec<BoxFuture<'a, ()>> = Vec::new();
            for neighbor in citing {
                if state.is_visited(&neighbor).await {
                    continue;
                }
                state
                    .edges
                    .lock()
                    .await
                    .push(NetworkEdge::new(neighbor.clone(), id.clone(), EdgeKind::Cites));
                children.push(self.process(state, neighbor, depth + 1, max_depth));
            }
            for neighbor in related {
                if state.is_visited(&neighbor).await {
                    continue;
                }
                state
                    .edges
                    .lock()
                    .await
                    .push(NetworkEdge::new(id.clone(), neighbor.clone(), EdgeKind::CitedBy));
                children.push(self.process(state, neighbor, depth + 1, max_depth));
            }

            // Fan-in join: the subtree is complete only after every launched
            // child has completed, success or failure.
            join_all(children).await;
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SummaryCache;
    use crate::db::store::MemoryStore;
    use crate::pubmed::testing::StubApi;
    use crate::pubmed::PubMedApi;

    struct Fixture {
        service: NetworkService,
        api: Arc<StubApi>,
        store: Arc<MemoryStore>,
        _cache_dir: tempfile::TempDir,
    }

    fn fixture(api: StubApi, mode: TraversalMode) -> Fixture {
        let cache_dir = tempfile::tempdir().unwrap();
        let api = Arc::new(api);
        let dyn_api: Arc<dyn PubMedApi> = api.clone();
        let store = Arc::new(MemoryStore::new());
        let config = GraphConfig {
            mode,
            default_depth: 2,
            max_depth: 3,
            link_limit: 25,
            batch_size: 10,
        };
        let service = NetworkService::new(
            Arc::new(Resolver::new(dyn_api.clone())),
            Arc::new(MetadataService::new(
                dyn_api.clone(),
                SummaryCache::new(cache_dir.path()),
            )),
            Arc::new(LinkService::new(dyn_api, config.link_limit)),
            store.clone(),
            config,
        );
        Fixture {
            service,
            api,
            store,
            _cache_dir: cache_dir,
        }
    }

    fn scenario_api() -> StubApi {
        StubApi::new()
            .with_doi("10.1000/xyz", "100")
            .with_paper("100", "Root")
            .with_paper("200", "Citer A")
            .with_paper("300", "Citer B")
            .with_citing("100", &["200", "300"])
    }

    fn node<'a>(network: &'a CitationNetwork, pmid: &str) -> &'a NetworkNode {
        network
            .nodes
            .iter()
            .find(|n| n.pmid == pmid)
            .unwrap_or_else(|| panic!("node {pmid} missing"))
    }

    #[tokio::test]
    async fn test_depth_one_scenario_staged() {
        let f = fixture(scenario_api(), TraversalMode::Staged);
        let network = f.service.generate("10.1000/xyz", 1).await.unwrap();

        assert_eq!(network.stats.node_count, 3);
        assert_eq!(node(&network, "100").level, 0);
        assert_eq!(node(&network, "200").level, 1);
        assert_eq!(node(&network, "300").level, 1);

        let mut edges: Vec<(String, String, EdgeKind)> = network
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.kind))
            .collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            edges,
            vec![
                ("200".into(), "100".into(), EdgeKind::Cites),
                ("300".into(), "100".into(), EdgeKind::Cites),
            ]
        );
    }

    #[tokio::test]
    async fn test_depth_one_scenario_interleaved() {
        let f = fixture(scenario_api(), TraversalMode::Interleaved);
        let network = f.service.generate("10.1000/xyz", 1).await.unwrap();

        assert_eq!(network.stats.node_count, 3);
        assert_eq!(network.stats.edge_count, 2);
        assert_eq!(node(&network, "200").level, 1);
        assert!(network.edges.iter().all(|e| e.kind == EdgeKind::Cites
            && e.target == "100"
            && (e.source == "200" || e.source == "300")));
    }

    #[tokio::test]
    async fn test_rerequest_is_memoized_with_zero_upstream_calls() {
        let f = fixture(scenario_api(), TraversalMode::Staged);
        let first = f.service.generate("10.1000/xyz", 1).await.unwrap();

        let calls_after_first = f.api.call_count();
        let second = f.service.generate("10.1000/xyz", 1).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(f.api.call_count(), calls_after_first);
    }

    #[tokio::test]
    async fn test_linkless_root_yields_single_node() {
        let api = StubApi::new()
            .with_doi("10.1000/lonely", "500")
            .with_paper("500", "Lonely");
        let f = fixture(api, TraversalMode::Staged);
        let network = f.service.generate("10.1000/lonely", 2).await.unwrap();

        assert_eq!(network.stats.node_count, 1);
        assert_eq!(network.stats.edge_count, 0);
        assert_eq!(node(&network, "500").level, 0);
    }

    #[tokio::test]
    async fn test_depth_zero_skips_link_discovery() {
        let f = fixture(scenario_api(), TraversalMode::Staged);
        let network = f.service.generate("10.1000/xyz", 0).await.unwrap();

        assert_eq!(network.stats.node_count, 1);
        assert_eq!(network.stats.edge_count, 0);
        // resolve + one summary fetch, no elink traffic
        assert_eq!(f.api.call_count(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_discoveries_dedup_and_min_level() {
        // 300 is reachable at depth 1 (from the root) and depth 2 (from
        // 200); staged mode must record the minimum.
        let api = StubApi::new()
            .with_doi("10.1000/overlap", "100")
            .with_paper("100", "Root")
            .with_paper("200", "A")
            .with_paper("300", "B")
            .with_paper("400", "C")
            .with_citing("100", &["200", "300"])
            .with_citing("200", &["300", "400"]);
        let f = fixture(api, TraversalMode::Staged);
        let network = f.service.generate("10.1000/overlap", 2).await.unwrap();

        let mut pmids: Vec<&str> = network.nodes.iter().map(|n| n.pmid.as_str()).collect();
        pmids.sort();
        assert_eq!(pmids, vec!["100", "200", "300", "400"]);
        assert_eq!(node(&network, "300").level, 1);
        assert_eq!(node(&network, "400").level, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_omits_node_and_filters_edges() {
        // No summary registered for 300: it is discovered, consumes its
        // dedup slot, but never becomes a node, and its edge is filtered.
        let api = StubApi::new()
            .with_doi("10.1000/partial", "100")
            .with_paper("100", "Root")
            .with_paper("200", "A")
            .with_citing("100", &["200", "300"]);
        let f = fixture(api, TraversalMode::Staged);
        let network = f.service.generate("10.1000/partial", 1).await.unwrap();

        assert_eq!(network.stats.node_count, 2);
        assert_eq!(network.stats.edge_count, 1);
        assert!(network.edges.iter().all(|e| e.source != "300" && e.target != "300"));
    }

    #[tokio::test]
    async fn test_every_level_bounded_by_requested_depth() {
        for mode in [TraversalMode::Staged, TraversalMode::Interleaved] {
            let api = StubApi::new()
                .with_doi("10.1000/chain", "100")
                .with_paper("100", "L0")
                .with_paper("200", "L1")
                .with_paper("300", "L2")
                .with_paper("400", "L3")
                .with_citing("100", &["200"])
                .with_citing("200", &["300"])
                .with_citing("300", &["400"]);
            let f = fixture(api, mode);
            let network = f.service.generate("10.1000/chain", 2).await.unwrap();

            assert!(network.nodes.iter().all(|n| n.level <= 2));
            assert!(network.nodes.iter().all(|n| n.pmid != "400"));
        }
    }

    #[tokio::test]
    async fn test_related_edges_point_outward() {
        let api = StubApi::new()
            .with_doi("10.1000/rel", "100")
            .with_paper("100", "Root")
            .with_paper("500", "Neighbor")
            .with_related("100", &["500"]);
        let f = fixture(api, TraversalMode::Staged);
        let network = f.service.generate("10.1000/rel", 1).await.unwrap();

        assert_eq!(network.edges.len(), 1);
        let edge = &network.edges[0];
        assert_eq!(edge.source, "100");
        assert_eq!(edge.target, "500");
        assert_eq!(edge.kind, EdgeKind::CitedBy);
    }

    #[tokio::test]
    async fn test_unresolvable_root_stores_nothing() {
        let f = fixture(StubApi::new(), TraversalMode::Staged);
        let err = f.service.generate("10.1000/ghost", 2).await.unwrap_err();

        assert!(matches!(err, AppError::DoiNotFound { .. }));
        assert!(f.store.list_networks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_failures_degrade_to_partial_network() {
        let api = StubApi::new()
            .with_doi("10.1000/deaf", "100")
            .with_paper("100", "Root")
            .failing_links();
        let f = fixture(api, TraversalMode::Interleaved);
        let network = f.service.generate("10.1000/deaf", 2).await.unwrap();

        assert_eq!(network.stats.node_count, 1);
        assert_eq!(network.stats.edge_count, 0);
    }

    #[tokio::test]
    async fn test_traversal_persists_paper_records() {
        let f = fixture(scenario_api(), TraversalMode::Staged);
        f.service.generate("10.1000/xyz", 1).await.unwrap();

        let stored = f.store.find_paper("200").await.unwrap().unwrap();
        assert_eq!(stored.title, "Citer A");
    }
}
