use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::aqi::{AqiCategory, Reading};
use crate::backend::models::Location;
use crate::common::AppState;
use crate::error::AppResult;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LocationQuery {
    /// Case-insensitive filter on id, place, coordinates or AQI
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingView {
    pub label: String,
    pub value: f64,
    pub unit: String,
}

impl From<Reading> for ReadingView {
    fn from(reading: Reading) -> Self {
        Self {
            label: reading.label.to_string(),
            value: reading.value,
            unit: reading.unit.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationView {
    pub id: String,
    pub name: String,
    pub region: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub aqi: Option<f64>,
    pub category: AqiCategory,
    pub category_label: String,
    /// Marker color as hex
    pub color: String,
    pub readings: Vec<ReadingView>,
    pub last_updated: Option<String>,
}

impl From<&Location> for LocationView {
    fn from(location: &Location) -> Self {
        let category = location.category();
        Self {
            id: location.location_id.to_string(),
            name: location.display_name(),
            region: location.region(),
            lat: location.lat,
            lon: location.lon,
            aqi: location.aqi(),
            category,
            category_label: category.label().to_string(),
            color: category.color().to_string(),
            readings: location.readings().into_iter().map(ReadingView::from).collect(),
            last_updated: location.last_updated.clone(),
        }
    }
}

/// List sensor nodes known to the backend
#[utoipa::path(
    get,
    path = "/api/nodes",
    responses(
        (status = 200, description = "Node ids", body = Vec<String>),
        (status = 502, description = "Backend unavailable"),
    ),
    tag = "locations"
)]
pub async fn list_nodes(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let nodes = state.listings.nodes(&state.backend).await?;
    Ok(Json((*nodes).clone()))
}

/// List monitoring locations with their AQI category
#[utoipa::path(
    get,
    path = "/api/locations",
    params(LocationQuery),
    responses(
        (status = 200, description = "Locations", body = Vec<LocationView>),
        (status = 502, description = "Backend unavailable"),
    ),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<LocationView>>> {
    let locations = state.listings.locations(&state.backend).await?;
    let term = query.search.unwrap_or_default();

    let response: Vec<LocationView> = locations
        .iter()
        .filter(|loc| loc.matches(&term))
        .map(LocationView::from)
        .collect();

    Ok(Json(response))
}

/// Drop cached node and location listings
#[utoipa::path(
    post,
    path = "/api/locations/refresh",
    responses(
        (status = 204, description = "Cache cleared"),
    ),
    tag = "locations"
)]
pub async fn refresh_listings(State(state): State<AppState>) -> StatusCode {
    state.listings.invalidate();
    StatusCode::NO_CONTENT
}
