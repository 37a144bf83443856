pub mod health;
pub mod locations;
pub mod scheduler;
pub mod series;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        series::list_series,
        series::get_series_window,
        scheduler::get_status,
        scheduler::start,
        scheduler::stop,
        scheduler::set_interval,
        scheduler::refresh,
        locations::list_nodes,
        locations::list_locations,
        locations::refresh_listings,
    ),
    components(
        schemas(
            series::SamplePoint,
            series::SeriesSummary,
            series::SeriesWindowResponse,
            crate::series::SeriesStatus,
            crate::sync::SchedulerStatus,
            crate::sync::CycleReport,
            scheduler::IntervalRequest,
            locations::LocationView,
            locations::ReadingView,
            crate::aqi::AqiCategory,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "series", description = "Live rolling windows per series"),
        (name = "scheduler", description = "Polling control"),
        (name = "locations", description = "Nodes and AQI map locations"),
    ),
    info(
        title = "AQI Live API",
        description = "Live time-series synchronizer for an air-quality sensor network",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let series_routes = Router::new()
        .route("/series", get(series::list_series))
        .route("/series/{series_id}", get(series::get_series_window));

    let scheduler_routes = Router::new()
        .route("/scheduler", get(scheduler::get_status))
        .route("/scheduler/start", post(scheduler::start))
        .route("/scheduler/stop", post(scheduler::stop))
        .route("/scheduler/interval", put(scheduler::set_interval))
        .route("/scheduler/refresh", post(scheduler::refresh));

    let location_routes = Router::new()
        .route("/nodes", get(locations::list_nodes))
        .route("/locations", get(locations::list_locations))
        .route("/locations/refresh", post(locations::refresh_listings));

    let api_routes = Router::new()
        .merge(series_routes)
        .merge(scheduler_routes)
        .merge(location_routes)
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
