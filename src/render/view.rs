use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{DisplayMeta, RenderSink};
use crate::series::{Sample, SeriesId};

/// Last window drawn for one series.
#[derive(Debug, Clone)]
pub struct RenderedSeries {
    pub meta: DisplayMeta,
    pub samples: Vec<Sample>,
    pub rendered_at: DateTime<Utc>,
    pub renders: u64,
}

/// In-memory chart surface read by the HTTP API.
#[derive(Debug, Default)]
pub struct DashboardView {
    charts: RwLock<HashMap<SeriesId, RenderedSeries>>,
}

impl DashboardView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn window(&self, id: &SeriesId) -> Option<RenderedSeries> {
        self.charts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    #[must_use]
    pub fn render_count(&self, id: &SeriesId) -> u64 {
        self.window(id).map_or(0, |r| r.renders)
    }
}

impl RenderSink for DashboardView {
    fn render(&self, id: &SeriesId, samples: &[Sample], meta: &DisplayMeta) {
        let mut charts = self.charts.write().unwrap_or_else(PoisonError::into_inner);
        let renders = charts.get(id).map_or(0, |r| r.renders) + 1;

        tracing::trace!(series = %id, points = samples.len(), renders, "Rendered series");

        charts.insert(
            id.clone(),
            RenderedSeries {
                meta: meta.clone(),
                samples: samples.to_vec(),
                rendered_at: Utc::now(),
                renders,
            },
        );
    }
}
