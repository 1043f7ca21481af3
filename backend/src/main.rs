mod api;
mod config;
mod db;
mod errors;
mod issuance;
mod models;
mod state;

use crate::config::Config;
use crate::errors::ApiError;
use crate::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    // Local state lives under DATA_DIR (ignored by git).
    std::fs::create_dir_all(&config.data_dir).map_err(|_| ApiError::Internal)?;

    let db_url = format!("sqlite:{}", config.db_path().to_string_lossy());

    let db = db::connect(&db_url).await?;
    db::init_schema(&db).await?;
    let persisted = db::count_events(&db).await?;
    tracing::info!(persisted, db = %config.db_path().display(), "event log opened");

    let addr = config.addr.clone();
    let state = AppState::load(db, config).await?;
    issuance::spawn_event_logger(&state);

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(%addr, "backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
