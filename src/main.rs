//! Jobwatch - status service for the message watcher's coordination layer
//!
//! Hosts the response cache and state coordinator, runs periodic
//! maintenance, and serves the status API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobwatch_core::{create_router, spawn_maintenance_task, AppState, Config, Coordinator};

static COORDINATOR: OnceCell<Coordinator> = OnceCell::const_new();

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Attach the state coordinator and build the response cache
/// 4. Start the maintenance task, tracked by the coordinator
/// 5. Serve the status API until SIGINT/SIGTERM
/// 6. Stop monitoring and cancel every tracked task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobwatch_core=info,jobwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobwatch core");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_capacity={}, pool_size={}, task_retention={}, port={}, maintenance_interval={}s",
        config.cache_capacity,
        config.pool_size,
        config.task_retention,
        config.server_port,
        config.maintenance_interval
    );

    let coordinator = Coordinator::new_or_attach(&COORDINATOR).await;
    let state = AppState::from_config(&config, coordinator.clone());
    info!("Response cache initialized");

    let maintenance = spawn_maintenance_task(
        state.cache.clone(),
        coordinator.clone(),
        config.maintenance_interval(),
        config.task_retention,
    );
    coordinator.track_task(maintenance).await;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = coordinator.stop_monitoring().await {
        handle.abort();
    }
    let cancelled = coordinator.cancel_all_tracked().await;
    info!("Cancelled {} background tasks", cancelled);

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
