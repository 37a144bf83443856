use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::time::Duration;
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::AppResult;
use crate::sync::{CycleReport, SchedulerStatus};

#[derive(Debug, Deserialize, IntoParams)]
pub struct StartQuery {
    /// New polling interval in milliseconds (keeps the current one if omitted)
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

/// Current polling state
#[utoipa::path(
    get,
    path = "/api/scheduler",
    responses(
        (status = 200, description = "Scheduler status", body = SchedulerStatus),
    ),
    tag = "scheduler"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// Start (or restart) polling
///
/// Runs one refresh cycle immediately, then one per interval.
#[utoipa::path(
    post,
    path = "/api/scheduler/start",
    params(StartQuery),
    responses(
        (status = 200, description = "Polling started", body = SchedulerStatus),
        (status = 400, description = "Invalid interval"),
    ),
    tag = "scheduler"
)]
pub async fn start(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> AppResult<Json<SchedulerStatus>> {
    match query.interval_ms {
        Some(ms) => state.scheduler.start(Duration::from_millis(ms)).await?,
        None => state.scheduler.resume().await,
    }
    Ok(Json(state.scheduler.status().await))
}

/// Pause polling
///
/// Fetches already in flight still complete and are applied.
#[utoipa::path(
    post,
    path = "/api/scheduler/stop",
    responses(
        (status = 200, description = "Polling stopped", body = SchedulerStatus),
    ),
    tag = "scheduler"
)]
pub async fn stop(State(state): State<AppState>) -> Json<SchedulerStatus> {
    state.scheduler.stop().await;
    Json(state.scheduler.status().await)
}

/// Change the polling interval
#[utoipa::path(
    put,
    path = "/api/scheduler/interval",
    request_body = IntervalRequest,
    responses(
        (status = 200, description = "Interval updated", body = SchedulerStatus),
        (status = 400, description = "Invalid interval"),
    ),
    tag = "scheduler"
)]
pub async fn set_interval(
    State(state): State<AppState>,
    Json(body): Json<IntervalRequest>,
) -> AppResult<Json<SchedulerStatus>> {
    state
        .scheduler
        .set_interval(Duration::from_millis(body.interval_ms))
        .await?;
    Ok(Json(state.scheduler.status().await))
}

/// Run one refresh cycle now and wait for it to settle
#[utoipa::path(
    post,
    path = "/api/scheduler/refresh",
    responses(
        (status = 200, description = "Cycle finished", body = CycleReport),
    ),
    tag = "scheduler"
)]
pub async fn refresh(State(state): State<AppState>) -> Json<CycleReport> {
    Json(state.scheduler.refresh_now().await)
}
