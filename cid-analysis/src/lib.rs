//! cid-analysis library interface
//!
//! Exposes the analysis pipeline for integration testing: draft/stage
//! models, request assembly, prediction and storage clients, the session
//! orchestrator, the history store, and the HTTP surface.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::services::AnalysisOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// History database connection pool **[CID-DB-010]**
    pub db: SqlitePool,
    /// Session registry and submission driver **[CID-WF-030]**
    pub orchestrator: AnalysisOrchestrator,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: AnalysisOrchestrator) -> Self {
        Self {
            db,
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analysis_routes())
        .merge(api::history_routes())
        .merge(api::health_routes())
        .with_state(state)
}
