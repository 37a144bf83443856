//! Rendering surface that receives each refreshed window.

mod view;

pub use view::{DashboardView, RenderedSeries};

use crate::series::{Sample, Series, SeriesId};

/// Display metadata handed to the sink alongside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMeta {
    pub name: String,
    pub unit: String,
}

impl From<&Series> for DisplayMeta {
    fn from(series: &Series) -> Self {
        Self {
            name: series.display_name.clone(),
            unit: series.unit.clone(),
        }
    }
}

/// Receives the current window of a series after every successful fetch.
///
/// Calls may repeat and arrive in any cross-series order; implementations
/// must treat each call as a full replacement of that series' chart.
pub trait RenderSink: Send + Sync {
    fn render(&self, id: &SeriesId, samples: &[Sample], meta: &DisplayMeta);
}
