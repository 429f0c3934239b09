use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub eutils: EutilsConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
}

/// NCBI E-utilities client configuration.
///
/// Without an API key NCBI allows 3 requests/second; with one, 10.
#[derive(Debug, Deserialize, Clone)]
pub struct EutilsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub tool: String,
    pub email: Option<String>,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Directory holding one raw summary file per PMID. Created lazily on
    /// first write.
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Data directory for the file backend; unused by the memory backend.
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    pub mode: TraversalMode,
    /// Depth used when a request omits `depth`.
    pub default_depth: usize,
    /// Hard cap on requested depth; deeper requests are clamped.
    pub max_depth: usize,
    /// Per-relation neighbor cap handed to link discovery.
    pub link_limit: usize,
    /// Staged mode: summaries fetched per batch, batches run sequentially.
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    Staged,
    Interleaved,
}

impl AppConfig {
    pub fn build() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.rust_log", "info,citegraph=debug")?
            .set_default("server.request_timeout_secs", 120)?
            .set_default("server.max_concurrent_requests", 100)?
            .set_default("eutils.base_url", "https://eutils.ncbi.nlm.nih.gov/entrez/eutils")?
            .set_default("eutils.tool", "citegraph")?
            .set_default("eutils.timeout_secs", 30)?
            .set_default("eutils.requests_per_second", 3)?
            .set_default("cache.dir", "data/summary_cache")?
            .set_default("store.backend", "memory")?
            .set_default("store.dir", "data/store")?
            .set_default("graph.mode", "staged")?
            .set_default("graph.default_depth", 2)?
            .set_default("graph.max_depth", 3)?
            .set_default("graph.link_limit", 25)?
            .set_default("graph.batch_size", 10)?
            // Add in settings from environment variables (with a prefix of APP)
            // E.g. `APP__SERVER__PORT=8080` would set `ServerConfig.port`
            .add_source(Environment::with_prefix("APP").separator("__").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
