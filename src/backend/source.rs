use async_trait::async_trait;
use chrono::Utc;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::backend::client::BackendClient;
use crate::backend::models::{HistoryResponse, LatestReading};
use crate::error::FetchError;
use crate::series::{Sample, Series, UpdateMode};

/// Which backend endpoint feeds the rolling windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// One sample per cycle from the latest-reading endpoint.
    Latest,
    /// The newest rows of the history endpoint every cycle.
    History,
}

impl DataSource {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Some(Self::Latest),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

/// Path templates for the per-stream endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointShape {
    pub latest_path: String,
    pub history_path: String,
}

impl EndpointShape {
    pub const STREAM_PLACEHOLDER: &'static str = "{stream}";

    #[must_use]
    pub fn latest_for(&self, stream: &str) -> String {
        self.latest_path.replace(Self::STREAM_PLACEHOLDER, stream)
    }

    #[must_use]
    pub fn history_for(&self, stream: &str) -> String {
        self.history_path.replace(Self::STREAM_PLACEHOLDER, stream)
    }
}

impl Default for EndpointShape {
    fn default() -> Self {
        Self {
            latest_path: "/api/gas/{stream}/latest".to_string(),
            history_path: "/api/{stream}".to_string(),
        }
    }
}

/// Everything that distinguishes one live chart page from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub data_source: DataSource,
    pub endpoint: EndpointShape,
    pub max_points: NonZeroUsize,
}

/// Where a refresh cycle gets new samples from.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch new samples for one series, oldest first.
    ///
    /// An empty vector means the backend answered without a reading.
    async fn fetch(&self, series: &Series) -> Result<Vec<Sample>, FetchError>;

    /// How each fetched batch is applied to the series' window.
    fn update_mode(&self) -> UpdateMode {
        UpdateMode::Append
    }
}

/// `SampleSource` backed by the HTTP backend.
pub struct BackendSource {
    client: Arc<BackendClient>,
    options: SyncOptions,
}

impl BackendSource {
    #[must_use]
    pub fn new(client: Arc<BackendClient>, options: SyncOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }
}

#[async_trait]
impl SampleSource for BackendSource {
    async fn fetch(&self, series: &Series) -> Result<Vec<Sample>, FetchError> {
        match self.options.data_source {
            DataSource::Latest => {
                let path = self.options.endpoint.latest_for(&series.stream);
                let reading = self.client.latest_reading(&path).await?;
                Ok(samples_from_latest(&reading))
            }
            DataSource::History => {
                let path = self.options.endpoint.history_for(&series.stream);
                let history = self.client.history(&path).await?;
                Ok(samples_from_history(&history, self.options.max_points))
            }
        }
    }

    fn update_mode(&self) -> UpdateMode {
        match self.options.data_source {
            DataSource::Latest => UpdateMode::Append,
            // Every history response carries the whole recent list.
            DataSource::History => UpdateMode::Replace,
        }
    }
}

/// A latest reading becomes one sample stamped with the receive time.
#[must_use]
pub fn samples_from_latest(reading: &LatestReading) -> Vec<Sample> {
    reading
        .value
        .map(|value| vec![Sample::new(Utc::now(), value)])
        .unwrap_or_default()
}

/// History rows become ascending samples, newest `max_points` only.
///
/// Rows without a value or with an unreadable timestamp are dropped.
#[must_use]
pub fn samples_from_history(history: &HistoryResponse, max_points: NonZeroUsize) -> Vec<Sample> {
    let mut samples: Vec<Sample> = history
        .data
        .iter()
        .filter_map(|row| {
            let value = row.sensor_value?;
            let Some(timestamp) = row.time() else {
                tracing::debug!(timestamp = %row.timestamp, "Skipping row with unreadable timestamp");
                return None;
            };
            Some(Sample::new(timestamp, value))
        })
        .collect();

    samples.sort_by_key(|s| s.timestamp);
    let excess = samples.len().saturating_sub(max_points.get());
    samples.drain(..excess);
    samples
}
