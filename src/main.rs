use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aqi_live::backend::{BackendClient, BackendSource};
use aqi_live::common::AppState;
use aqi_live::config::{Config, Deployment};
use aqi_live::render::DashboardView;
use aqi_live::routes;
use aqi_live::series::SeriesRegistry;
use aqi_live::sync::discovery;
use aqi_live::sync::{FetchScheduler, Synchronizer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (JSON lines outside local runs)
    dotenvy::dotenv().ok();
    let json_logs = Deployment::from_env().json_logs();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aqi_live=debug".into()),
        )
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    tracing::info!("Starting aqi-live...");

    // Load configuration (fail-fast)
    let config = Config::from_env()?;
    tracing::info!(
        deployment = ?config.deployment,
        backend = %config.backend_base_url,
        data_source = ?config.data_source,
        interval_ms = config.poll_interval_ms,
        max_points = config.max_points.get(),
        "Configuration loaded"
    );

    let backend = Arc::new(BackendClient::new(&config)?);
    tracing::info!(base_url = %backend.base_url(), "Backend client initialized");

    // Populate the registry from the node topology or the static series list
    let mut registry = SeriesRegistry::new(config.max_points);
    let registered = match config.node_id.as_deref() {
        Some(node_id) => discovery::discover_node(&mut registry, &backend, node_id).await?,
        None => discovery::register_static(&mut registry, &config.series)?,
    };
    if registered == 0 {
        tracing::warn!("No series registered, polling will have nothing to fetch");
    } else {
        tracing::info!(series = registered, "Series registered");
    }
    let registry = registry.shared();

    let view = Arc::new(DashboardView::new());
    let source = Arc::new(BackendSource::new(
        Arc::clone(&backend),
        config.sync_options(),
    ));
    let synchronizer = Arc::new(Synchronizer::new(
        Arc::clone(&registry),
        source,
        view.clone(),
    ));
    let scheduler = Arc::new(FetchScheduler::new(synchronizer, config.poll_interval()));

    if config.autostart {
        scheduler.start(config.poll_interval()).await?;
    } else {
        tracing::info!("Autostart disabled, waiting for POST /api/scheduler/start");
    }

    let addr = config.bind_address();
    let state = AppState::new(
        config,
        registry,
        Arc::clone(&scheduler),
        view,
        backend,
    );

    // Build router
    let app = routes::build_router(state);

    // Start server with graceful shutdown
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
