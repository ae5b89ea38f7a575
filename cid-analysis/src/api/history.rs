//! Analysis history API handlers
//!
//! Read-side of the history store plus the bulk per-user deletion path.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::AnalysisRecord;
use crate::AppState;

/// GET /history query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: String,
    /// Case-insensitive substring filter on the result label
    /// ("positive"/"negative" views)
    pub result_filter: Option<String>,
}

/// GET /history response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub analyses: Vec<AnalysisRecord>,
    pub count: usize,
}

/// DELETE /history response
#[derive(Debug, Serialize)]
pub struct DeleteHistoryResponse {
    pub deleted: usize,
}

/// GET /history?user_id=...&result_filter=positive
pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    if query.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }

    let analyses = db::analyses::list_analyses(
        &state.db,
        &query.user_id,
        query.result_filter.as_deref(),
    )
    .await?;

    let count = analyses.len();
    Ok(Json(HistoryResponse { analyses, count }))
}

/// DELETE /history?user_id=...
///
/// Bulk account deletion: the only way history rows are removed.
pub async fn delete_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<DeleteHistoryResponse>> {
    if query.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }

    let deleted = db::analyses::delete_analyses_for_user(&state.db, &query.user_id).await?;
    tracing::info!(user_id = %query.user_id, deleted, "History bulk-deleted");

    Ok(Json(DeleteHistoryResponse { deleted }))
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route("/history", get(list_history).delete(delete_history))
}
