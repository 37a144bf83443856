use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::backend::models::{
    HistoryResponse, LatestReading, Location, LocationsResponse, NodesResponse, TopologyResponse,
};
use crate::config::Config;
use crate::error::FetchError;

/// Client for the sensor backend's JSON endpoints.
pub struct BackendClient {
    http_client: Client,
    base_url: String,
    nodes_path: String,
    locations_path: String,
    topology_path: String,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns `FetchError::Request` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_seconds))
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.backend_base_url.clone(),
            nodes_path: config.nodes_path.clone(),
            locations_path: config.locations_path.clone(),
            topology_path: config.topology_path.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the identifiers of every known node.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` if the request fails, the status is not a
    /// success, or the payload is malformed or reports an error.
    pub async fn list_nodes(&self) -> Result<Vec<String>, FetchError> {
        let response: NodesResponse = self.get_json(&self.nodes_path).await?;
        Ok(response.nodes.into_iter().map(|id| id.0).collect())
    }

    /// List every known location with coordinates and latest readings.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` if the request fails, the status is not a
    /// success, or the payload is malformed or reports an error.
    pub async fn list_locations(&self) -> Result<Vec<Location>, FetchError> {
        let response: LocationsResponse = self.get_json(&self.locations_path).await?;
        Ok(response.locations)
    }

    /// Latest reading of a stream, at an already rendered path.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` if the request fails, the status is not a
    /// success, or the payload is malformed or reports an error.
    pub async fn latest_reading(&self, path: &str) -> Result<LatestReading, FetchError> {
        self.get_json(path).await
    }

    /// Historical readings of a stream, at an already rendered path.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` if the request fails, the status is not a
    /// success, or the payload is malformed or reports an error.
    pub async fn history(&self, path: &str) -> Result<HistoryResponse, FetchError> {
        self.get_json(path).await
    }

    /// Sensor/measurement layout of one node.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` if the request fails, the status is not a
    /// success, or the payload is malformed or reports an error.
    pub async fn node_topology(&self, node_id: &str) -> Result<TopologyResponse, FetchError> {
        let path = self.topology_path.replace("{node}", node_id);
        self.get_json(&path).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Request(format!("Failed to get response text: {e}")))?;

        if !status.is_success() {
            // The backend answers most failures with {"error": "..."}
            if let Some(message) = reported_error(&text) {
                return Err(FetchError::Backend(message));
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        decode_payload(&text).inspect_err(|e| {
            tracing::debug!(
                url = %url,
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to decode backend response"
            );
        })
    }
}

/// Decode a JSON body, treating an `error` field as a backend-reported failure.
///
/// # Errors
///
/// Returns `FetchError::Backend` when the payload reports an error and
/// `FetchError::Decode` when it is not the expected shape.
pub fn decode_payload<T: DeserializeOwned>(text: &str) -> Result<T, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| FetchError::Decode(e.to_string()))?;

    if let Some(message) = error_field(&value) {
        return Err(FetchError::Backend(message));
    }

    serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))
}

fn reported_error(text: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| error_field(&value))
}

fn error_field(value: &serde_json::Value) -> Option<String> {
    match value.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
