//! TTL caching for the backend's listing endpoints.
//!
//! Node and location listings change slowly compared with the polling
//! cadence, and every browser tab asks for them. Entries expire after the
//! configured TTL; the refresh route can drop them early.
//!
//! Per-series samples are never cached here: the rolling windows are the
//! source of truth for those.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::BackendClient;
use crate::backend::models::Location;
use crate::error::FetchError;

const NODES_KEY: &str = "nodes";
const LOCATIONS_KEY: &str = "locations";

#[derive(Clone)]
pub struct ListingCache {
    nodes: Cache<&'static str, Arc<Vec<String>>>,
    locations: Cache<&'static str, Arc<Vec<Location>>>,
}

impl ListingCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            nodes: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            locations: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Node ids, from cache or the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's `FetchError` on a cache miss that fails.
    pub async fn nodes(&self, client: &BackendClient) -> Result<Arc<Vec<String>>, FetchError> {
        self.nodes
            .try_get_with(NODES_KEY, async {
                tracing::debug!(cache_key = NODES_KEY, "cache_miss");
                client.list_nodes().await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Locations with readings, from cache or the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's `FetchError` on a cache miss that fails.
    pub async fn locations(
        &self,
        client: &BackendClient,
    ) -> Result<Arc<Vec<Location>>, FetchError> {
        self.locations
            .try_get_with(LOCATIONS_KEY, async {
                tracing::debug!(cache_key = LOCATIONS_KEY, "cache_miss");
                client.list_locations().await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Drop every cached listing so the next read goes to the backend.
    pub fn invalidate(&self) {
        self.nodes.invalidate_all();
        self.locations.invalidate_all();
        tracing::debug!("cache_invalidated");
    }
}
