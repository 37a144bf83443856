use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::series::{Sample, SeriesStatus};

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SamplePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl From<&Sample> for SamplePoint {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            value: sample.value,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesSummary {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub status: SeriesStatus,
    /// Message of the last failed fetch (cleared by the next success)
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    /// Samples currently in the window
    pub points: usize,
    pub capacity: usize,
    pub latest: Option<SamplePoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesWindowResponse {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub status: SeriesStatus,
    /// When the window was last drawn (null if never)
    pub rendered_at: Option<DateTime<Utc>>,
    /// Samples ascending by timestamp
    pub samples: Vec<SamplePoint>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Response format: json (default) or csv
    #[serde(default = "default_format")]
    pub format: String,
}
