mod config;
mod db;
mod error;
mod export;
mod links;
mod log_capture;
mod metrics;
mod record;
mod routes;
mod server;
mod session;
mod state;
mod status;
mod store;
mod tester;

use clap::Parser;
use std::sync::Arc;
use tracing::info;

use config::{CliArgs, DashboardConfig};
use db::DashboardDb;
use log_capture::{LogLevel, LogSource};
use state::DashboardState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vortex_dashboard=info,tower_http=info".into()),
        )
        .init();

    let args = CliArgs::parse();
    info!("Starting vortex-dashboard v{}", env!("CARGO_PKG_VERSION"));

    let config = DashboardConfig::from_args(args);
    info!("Tester URL: {}", config.tester_url);
    info!("Data dir: {:?}", config.data_dir);

    let port = config.port;
    let db = DashboardDb::open(&config.data_dir)?;
    let state = Arc::new(DashboardState::new(config, db));

    // Surface persisted store coordinates in the startup log so a user
    // knows a token is still needed before publishing.
    if let Ok(Some((owner, repo))) = state.db.load_store_settings() {
        info!("Remote store settings loaded: {}/{} (token required)", owner, repo);
    }

    state
        .logs
        .emit(
            LogSource::Dashboard,
            LogLevel::Info,
            format!("Dashboard starting on port {}", port),
        )
        .await;

    let router = server::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Dashboard listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    info!("Dashboard shutting down");
    Ok(())
}

async fn shutdown_signal(state: Arc<DashboardState>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    ctrl_c.await;
    info!("Received shutdown signal");
    state
        .logs
        .emit(LogSource::Dashboard, LogLevel::Info, "Shutting down")
        .await;
    let _ = state.shutdown_tx.send(());
}
