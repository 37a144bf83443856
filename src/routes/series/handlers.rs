use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header::{self, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::series::{Sample, SeriesId};

use super::types::{SamplePoint, SeriesSummary, SeriesWindowResponse, WindowQuery};

/// List registered series with their status
#[utoipa::path(
    get,
    path = "/api/series",
    responses(
        (status = 200, description = "Series in registration order", body = Vec<SeriesSummary>),
    ),
    tag = "series"
)]
pub async fn list_series(State(state): State<AppState>) -> AppResult<Json<Vec<SeriesSummary>>> {
    let registry = state.registry.read().await;

    let mut response = Vec::with_capacity(registry.len());
    for series in registry.all() {
        let buffer = registry.buffer(&series.id)?;
        let health = registry.health(&series.id)?;
        response.push(SeriesSummary {
            id: series.id.to_string(),
            name: series.display_name.clone(),
            unit: series.unit.clone(),
            status: health.status,
            last_error: health.last_error.clone(),
            last_success: health.last_success,
            points: buffer.len(),
            capacity: buffer.capacity().get(),
            latest: buffer.latest().map(SamplePoint::from),
        });
    }

    Ok(Json(response))
}

/// Get the rendered window of one series
///
/// Supports JSON and CSV formats.
#[utoipa::path(
    get,
    path = "/api/series/{series_id}",
    params(
        ("series_id" = String, Path, description = "Series id, e.g. winsen1:pm25"),
        WindowQuery,
    ),
    responses(
        (status = 200, description = "Current window", body = SeriesWindowResponse),
        (status = 400, description = "Unsupported format"),
        (status = 404, description = "Series not registered"),
    ),
    tag = "series"
)]
pub async fn get_series_window(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
    Query(query): Query<WindowQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = SeriesId::new(series_id);

    let (series, status) = {
        let registry = state.registry.read().await;
        let series = registry.get(&id)?.clone();
        let status = registry.health(&id)?.status;
        (series, status)
    };

    let rendered = state.view.window(&id);
    let samples: &[Sample] = match &rendered {
        Some(r) => &r.samples,
        None => &[],
    };

    match determine_format(&query.format, &headers).as_str() {
        "json" => Ok(Json(SeriesWindowResponse {
            id: series.id.to_string(),
            name: series.display_name,
            unit: series.unit,
            status,
            rendered_at: rendered.as_ref().map(|r| r.rendered_at),
            samples: samples.iter().map(SamplePoint::from).collect(),
        })
        .into_response()),
        "csv" => build_csv_response(samples),
        other => Err(AppError::BadRequest(format!(
            "Unsupported format '{other}', expected json or csv"
        ))),
    }
}

fn determine_format(query_format: &str, headers: &HeaderMap) -> String {
    // Query parameter takes precedence
    if query_format != "json" {
        return query_format.to_lowercase();
    }

    if let Some(accept) = headers.get(header::ACCEPT)
        && let Ok(accept_str) = accept.to_str()
        && accept_str.contains("text/csv")
    {
        return "csv".to_string();
    }

    "json".to_string()
}

fn build_csv_response(samples: &[Sample]) -> AppResult<Response> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["timestamp", "value"])
        .map_err(|e| AppError::Internal(e.to_string()))?;
    for sample in samples {
        writer
            .write_record([sample.timestamp.to_rfc3339(), sample.value.to_string()])
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}
