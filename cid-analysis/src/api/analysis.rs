//! Analysis session API handlers
//!
//! **[CID-API-010]** Wizard surface: create a session, mutate the draft
//! stage by stage, advance past gates, submit, retry, abandon.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{AnalysisDraft, ColonyAge, SubmissionState};
use crate::services::SubmitOutcome;
use crate::AppState;

/// POST /analysis request
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
}

/// Session snapshot returned by every draft-mutating handler
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user_id: String,
    pub state: SubmissionState,
    pub draft: AnalysisDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::models::AnalysisSession> for SessionResponse {
    fn from(session: crate::models::AnalysisSession) -> Self {
        Self {
            session_id: session.session_id,
            user_id: session.user_id,
            state: session.state,
            draft: session.draft,
            error: session.error,
            started_at: session.started_at,
        }
    }
}

/// POST /analysis/:id/characteristics request
#[derive(Debug, Deserialize)]
pub struct ToggleCharacteristicRequest {
    pub characteristic: String,
}

/// POST /analysis/:id/medium request
#[derive(Debug, Deserialize)]
pub struct SelectMediumRequest {
    pub culture_medium: String,
}

/// POST /analysis/:id/image request
///
/// Path of the captured image on this host; the handler uploads it and
/// attaches the signed URL.
#[derive(Debug, Deserialize)]
pub struct AttachImageRequest {
    pub local_path: String,
}

/// POST /analysis/:id/colony-age request
#[derive(Debug, Deserialize)]
pub struct SelectColonyAgeRequest {
    pub colony_age: ColonyAge,
}

/// POST /analysis
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    if request.user_id.trim().is_empty() {
        return Err(crate::error::ApiError::BadRequest(
            "user_id must not be empty".to_string(),
        ));
    }
    let session = state.orchestrator.create_session(request.user_id).await;
    Ok(Json(session.into()))
}

/// GET /analysis/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.orchestrator.get_session(session_id).await?;
    Ok(Json(session.into()))
}

/// POST /analysis/:session_id/characteristics
pub async fn toggle_characteristic(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ToggleCharacteristicRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .orchestrator
        .toggle_characteristic(session_id, &request.characteristic)
        .await?;
    Ok(Json(session.into()))
}

/// POST /analysis/:session_id/medium
pub async fn select_medium(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectMediumRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .orchestrator
        .select_medium(session_id, &request.culture_medium)
        .await?;
    Ok(Json(session.into()))
}

/// POST /analysis/:session_id/image
pub async fn attach_image(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AttachImageRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .orchestrator
        .attach_image(session_id, &request.local_path)
        .await?;
    Ok(Json(session.into()))
}

/// POST /analysis/:session_id/colony-age
pub async fn select_colony_age(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectColonyAgeRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .orchestrator
        .set_colony_age(session_id, request.colony_age)
        .await?;
    Ok(Json(session.into()))
}

/// POST /analysis/:session_id/advance
pub async fn advance(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.orchestrator.advance(session_id).await?;
    Ok(Json(session.into()))
}

/// POST /analysis/:session_id/submit
///
/// Also the explicit retry entry point: a FAILED session re-enters
/// HEALTH_CHECKING through the same call.
pub async fn submit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SubmitOutcome>> {
    let outcome = state.orchestrator.submit(session_id).await?;
    Ok(Json(outcome))
}

/// DELETE /analysis/:session_id
pub async fn abandon(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    state.orchestrator.abandon_session(session_id).await?;
    Ok(Json(serde_json::json!({ "abandoned": session_id })))
}

/// Build analysis session routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis", post(create_session))
        .route("/analysis/:session_id", get(get_session).delete(abandon))
        .route(
            "/analysis/:session_id/characteristics",
            post(toggle_characteristic),
        )
        .route("/analysis/:session_id/medium", post(select_medium))
        .route("/analysis/:session_id/image", post(attach_image))
        .route("/analysis/:session_id/colony-age", post(select_colony_age))
        .route("/analysis/:session_id/advance", post(advance))
        .route("/analysis/:session_id/submit", post(submit))
}
