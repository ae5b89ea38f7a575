//! cid-analysis - Colony Analysis Service
//!
//! **Module Identity:**
//! - Name: cid-analysis (Analysis Session Pipeline)
//! - Default port: 5810
//!
//! Guides one bacterial identification analysis per session: collect
//! characteristics, culture medium, sample image, and colony age; call
//! the external ML prediction service; persist the result to history.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cid_analysis::services::{AnalysisOrchestrator, PredictionClient, StorageClient};
use cid_analysis::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Step 1: Load TOML config (missing file is fine; malformed is not)
    let toml_config = cid_common::config::load_or_default()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // Initialize tracing (RUST_LOG overrides the configured level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting cid-analysis (Colony Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 2: Resolve full configuration; the prediction URL has no
    // default, so an unconfigured deployment fails here
    let config = cid_analysis::config::resolve(&toml_config)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    info!("Prediction API: {}", config.prediction_api_url);
    info!("Storage bucket: {}", config.storage.bucket);

    // Step 3: Open or create the history database
    let db_path = std::path::PathBuf::from(&config.database_path);
    info!("Database: {}", db_path.display());
    let db_pool = cid_analysis::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 4: Build clients and orchestrator
    let prediction = Arc::new(
        PredictionClient::new(config.prediction_api_url.clone())
            .map_err(|e| anyhow::anyhow!("Prediction client init failed: {}", e))?,
    );
    let storage = Arc::new(
        StorageClient::new(config.storage.clone())
            .map_err(|e| anyhow::anyhow!("Storage client init failed: {}", e))?,
    );
    let orchestrator = AnalysisOrchestrator::new(prediction, storage, db_pool.clone());

    let state = AppState::new(db_pool, orchestrator);
    let app = cid_analysis::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
