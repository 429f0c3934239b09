use crate::cache::SummaryCache;
use crate::config::AppConfig;
use crate::db::store::NetworkStore;
use crate::pubmed::PubMedApi;
use crate::services::links::LinkService;
use crate::services::metadata::MetadataService;
use crate::services::network::NetworkService;
use crate::services::papers::PaperService;
use crate::services::resolver::Resolver;
use std::sync::Arc;

pub mod links;
pub mod metadata;
pub mod network;
pub mod papers;
pub mod resolver;

// A container for all services to be injected into routes. Dependencies are
// constructed once here and passed down explicitly; there is no global state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<Resolver>,
    pub papers: Arc<PaperService>,
    pub networks: Arc<NetworkService>,
    pub store: Arc<dyn NetworkStore>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        api: Arc<dyn PubMedApi>,
        cache: SummaryCache,
        store: Arc<dyn NetworkStore>,
    ) -> Self {
        let resolver = Arc::new(Resolver::new(api.clone()));
        let metadata = Arc::new(MetadataService::new(api.clone(), cache));
        let links = Arc::new(LinkService::new(api, config.graph.link_limit));
        let networks = Arc::new(NetworkService::new(
            resolver.clone(),
            metadata.clone(),
            links,
            store.clone(),
            config.graph.clone(),
        ));
        let papers = Arc::new(PaperService::new(metadata, store.clone()));

        Self {
            config,
            resolver,
            papers,
            networks,
            store,
        }
    }
}
