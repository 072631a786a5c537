//! Vehicle Recommendation Service - Entry Point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vehicle_recsys::{
    config::AppConfig,
    recommend::{EngineSettings, Recommender},
    server,
    storage::Stores,
    worker::{self, WorkerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting vehicle recommendation service");

    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config from environment: {e}, using defaults");
        AppConfig::default()
    });

    info!(
        storage_mode = %config.storage.mode,
        lookback_days = config.engine.lookback_days,
        refresh_interval_s = config.engine.refresh_interval_s,
        "Configuration loaded"
    );

    let stores = Stores::open(&config.storage).context("Failed to open storage")?;

    let engine = Arc::new(Recommender::from_stores(
        &stores,
        EngineSettings::from(&config.engine),
    ));

    // Background refresh, or a single fit when periodic refresh is disabled
    let refresh_worker = if config.engine.refresh_interval_s > 0 {
        Some(worker::spawn_refresh_worker(
            engine.clone(),
            WorkerConfig {
                refresh_interval: Duration::from_secs(config.engine.refresh_interval_s),
                fit_on_start: true,
            },
        ))
    } else {
        if let Err(e) = engine.fit(None).await {
            warn!(error = %e, "Initial fit failed, serving fallbacks until refreshed");
        }
        None
    };

    let addr = config
        .server
        .socket_addr()
        .context("Invalid server address")?;

    // Create app state and router
    let state = server::AppState::with_engine(config, stores, engine);
    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = refresh_worker {
        handle.stop().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_recsys=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
