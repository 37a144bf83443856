use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::backend::SampleSource;
use crate::render::{DisplayMeta, RenderSink};
use crate::series::{Series, SharedRegistry};

/// Outcome of one fetch-all pass.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

/// Refreshes every registered series from a source into a sink.
pub struct Synchronizer {
    registry: SharedRegistry,
    source: Arc<dyn SampleSource>,
    sink: Arc<dyn RenderSink>,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
    cycles_completed: AtomicU64,
}

impl Synchronizer {
    pub fn new(
        registry: SharedRegistry,
        source: Arc<dyn SampleSource>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        Self {
            registry,
            source,
            sink,
            last_refreshed: RwLock::new(None),
            cycles_completed: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// When the last cycle settled, if any has.
    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed.read().await
    }

    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Run one cycle: fetch every series concurrently, apply and render each
    /// result as it arrives, then stamp the cycle once all have settled.
    ///
    /// Individual failures never abort the cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let targets: Vec<Series> = self.registry.read().await.all().cloned().collect();

        tracing::debug!(series = targets.len(), "Starting refresh cycle");

        let outcomes = join_all(targets.iter().map(|series| self.refresh_series(series))).await;

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        let failed = outcomes.len() - succeeded;
        let finished_at = Utc::now();

        *self.last_refreshed.write().await = Some(finished_at);
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);

        if failed > 0 {
            tracing::info!(succeeded, failed, "Refresh cycle settled with failures");
        } else {
            tracing::debug!(succeeded, "Refresh cycle settled");
        }

        CycleReport {
            succeeded,
            failed,
            finished_at,
        }
    }

    async fn refresh_series(&self, series: &Series) -> bool {
        match self.source.fetch(series).await {
            Ok(samples) => {
                // Held across render: the sink sees windows in record order.
                let mut registry = self.registry.write().await;
                match registry.record_samples(&series.id, samples, self.source.update_mode()) {
                    Ok(window) => {
                        self.sink
                            .render(&series.id, &window, &DisplayMeta::from(series));
                        true
                    }
                    Err(e) => {
                        // Removed while the fetch was in flight.
                        tracing::debug!(series = %series.id, error = %e, "Dropping late result");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::warn!(series = %series.id, error = %e, "Series fetch failed");
                if let Err(e) = self
                    .registry
                    .write()
                    .await
                    .record_failure(&series.id, e.to_string())
                {
                    tracing::debug!(series = %series.id, error = %e, "Dropping late failure");
                }
                false
            }
        }
    }
}
