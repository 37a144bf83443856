use std::sync::Arc;
use std::time::Duration;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::render::DashboardView;
use crate::series::SharedRegistry;
use crate::services::cache::ListingCache;
use crate::sync::FetchScheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: SharedRegistry,
    pub scheduler: Arc<FetchScheduler>,
    pub view: Arc<DashboardView>,
    pub backend: Arc<BackendClient>,
    pub listings: ListingCache,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: SharedRegistry,
        scheduler: Arc<FetchScheduler>,
        view: Arc<DashboardView>,
        backend: Arc<BackendClient>,
    ) -> Self {
        let listings = ListingCache::new(Duration::from_secs(config.cache_ttl_seconds));

        Self {
            config: Arc::new(config),
            registry,
            scheduler,
            view,
            backend,
            listings,
        }
    }
}
