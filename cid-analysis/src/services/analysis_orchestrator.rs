//! Analysis session orchestration
//!
//! **[CID-WF-030]** Owns the in-memory session registry and drives one
//! submission end to end: READY gate → assemble → health probe →
//! predict → auto-persist. Sessions are independent; the registry lock
//! is held only around state reads/writes, never across a network call.
//!
//! An abandoned session's in-flight result is discarded on arrival: every
//! write-back re-checks that the session still exists and is still in the
//! expected state before touching it (stale-write guard).

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db;
use crate::error::{AnalysisError, ApiError, ApiResult};
use crate::models::{
    AnalysisRecord, AnalysisSession, AnalysisStage, ColonyAge, ConfidenceLevel,
    PredictionResponse, SubmissionState,
};
use crate::services::{request_assembler, PredictionClient, StorageClient};

/// Outcome of one successful submission
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmitOutcome {
    pub session_id: Uuid,
    pub state: SubmissionState,
    pub result: PredictionResponse,
    /// Derived display bucket for the confidence percentage
    pub confidence_level: ConfidenceLevel,
    /// Whether the history auto-save succeeded
    pub saved: bool,
    /// Dismissable notice when the auto-save failed (never blocks the result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_notice: Option<String>,
}

/// Session registry and submission driver
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    sessions: Arc<RwLock<HashMap<Uuid, AnalysisSession>>>,
    prediction: Arc<PredictionClient>,
    storage: Arc<StorageClient>,
    db: SqlitePool,
}

impl AnalysisOrchestrator {
    pub fn new(
        prediction: Arc<PredictionClient>,
        storage: Arc<StorageClient>,
        db: SqlitePool,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            prediction,
            storage,
            db,
        }
    }

    /// Create a new analysis session with an empty draft
    pub async fn create_session(&self, user_id: String) -> AnalysisSession {
        let session = AnalysisSession::new(user_id);
        let snapshot = session.clone();

        self.sessions
            .write()
            .await
            .insert(session.session_id, session);

        tracing::info!(
            session_id = %snapshot.session_id,
            user_id = %snapshot.user_id,
            "Analysis session created"
        );
        snapshot
    }

    /// Snapshot of a session
    pub async fn get_session(&self, session_id: Uuid) -> ApiResult<AnalysisSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Analysis session not found: {}", session_id)))
    }

    /// Abandon a session, discarding the draft
    ///
    /// Any in-flight submission result arriving afterwards is dropped by
    /// the write-back liveness checks.
    pub async fn abandon_session(&self, session_id: Uuid) -> ApiResult<()> {
        let removed = self.sessions.write().await.remove(&session_id);
        match removed {
            Some(session) => {
                tracing::info!(
                    session_id = %session_id,
                    state = ?session.state,
                    "Analysis session abandoned"
                );
                Ok(())
            }
            None => Err(ApiError::NotFound(format!(
                "Analysis session not found: {}",
                session_id
            ))),
        }
    }

    /// Apply a draft mutation under the registry lock
    ///
    /// The draft is locked the moment a submission starts: mutating it
    /// while HEALTH_CHECKING/PREDICTING would let the live draft diverge
    /// from the snapshot being predicted and persisted.
    async fn with_draft<F>(&self, session_id: Uuid, mutate: F) -> ApiResult<AnalysisSession>
    where
        F: FnOnce(&mut AnalysisSession) -> cid_common::Result<()>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&session_id).ok_or_else(|| {
            ApiError::NotFound(format!("Analysis session not found: {}", session_id))
        })?;
        if session.in_flight() {
            return Err(ApiError::Conflict(
                "Draft is locked while a submission is in flight".to_string(),
            ));
        }
        if session.is_complete() {
            return Err(ApiError::Conflict(
                "Analysis already completed; start a new session".to_string(),
            ));
        }
        mutate(session)?;
        Ok(session.clone())
    }

    /// Flip membership of an observational tag
    pub async fn toggle_characteristic(
        &self,
        session_id: Uuid,
        tag: &str,
    ) -> ApiResult<AnalysisSession> {
        self.with_draft(session_id, |s| s.draft.toggle_characteristic(tag))
            .await
    }

    /// Single-choice culture medium selection (toggle semantics)
    pub async fn select_medium(
        &self,
        session_id: Uuid,
        medium: &str,
    ) -> ApiResult<AnalysisSession> {
        self.with_draft(session_id, |s| s.draft.select_medium(medium))
            .await
    }

    /// Select the colony age bucket
    pub async fn set_colony_age(
        &self,
        session_id: Uuid,
        age: ColonyAge,
    ) -> ApiResult<AnalysisSession> {
        self.with_draft(session_id, |s| s.draft.set_colony_age(age))
            .await
    }

    /// Advance the wizard past the current stage if its gate passes
    pub async fn advance(&self, session_id: Uuid) -> ApiResult<AnalysisSession> {
        let snapshot = self
            .with_draft(session_id, |s| s.draft.advance().map(|_| ()))
            .await?;
        tracing::debug!(
            session_id = %session_id,
            stage = ?snapshot.draft.stage,
            "Draft advanced"
        );
        Ok(snapshot)
    }

    /// Upload a captured sample image and attach its signed URL
    ///
    /// **[CID-INT-030]** Reads the local image bytes, uploads them under
    /// the session owner's namespace, and attaches the signed URL. On any
    /// failure the draft keeps no partial state; the user retries capture.
    pub async fn attach_image(
        &self,
        session_id: Uuid,
        local_path: &str,
    ) -> ApiResult<AnalysisSession> {
        // Fail early if the session is gone or already submitted
        let owner_id = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(&session_id).ok_or_else(|| {
                ApiError::NotFound(format!("Analysis session not found: {}", session_id))
            })?;
            if session.in_flight() {
                return Err(ApiError::Conflict(
                    "Draft is locked while a submission is in flight".to_string(),
                ));
            }
            if session.is_complete() || session.draft.frozen {
                return Err(ApiError::Conflict(
                    "Analysis already completed; start a new session".to_string(),
                ));
            }
            session.user_id.clone()
        };

        let bytes = tokio::fs::read(local_path).await.map_err(|e| {
            AnalysisError::Upload(format!("Failed to read image {}: {}", local_path, e))
        })?;

        // Lock dropped during the upload; re-check on write-back
        let signed_url = self.storage.upload_sample(&owner_id, bytes).await?;

        self.with_draft(session_id, |s| s.draft.set_sample_image_ref(signed_url))
            .await
    }

    /// Submit the draft for prediction
    ///
    /// **[CID-WF-020]** Drives the submission state machine. Also serves
    /// as the explicit retry transition: FAILED re-enters HEALTH_CHECKING
    /// here. Rejected with 409 while a submission is already in flight,
    /// without issuing any network call.
    pub async fn submit(&self, session_id: Uuid) -> ApiResult<SubmitOutcome> {
        // Gate checks and request assembly under the lock; no network yet
        let (request, draft, user_id) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(&session_id).ok_or_else(|| {
                ApiError::NotFound(format!("Analysis session not found: {}", session_id))
            })?;

            if session.in_flight() {
                return Err(ApiError::Conflict(
                    "A submission is already in flight for this session".to_string(),
                ));
            }
            if session.is_complete() {
                return Err(ApiError::Conflict(
                    "Analysis already completed; start a new session".to_string(),
                ));
            }
            if session.draft.stage != AnalysisStage::Ready {
                return Err(ApiError::BadRequest(format!(
                    "Draft is not ready for submission (stage {:?})",
                    session.draft.stage
                )));
            }

            // Validation failures leave the state untouched: the draft is
            // fixed locally and resubmitted, no retry transition involved
            let request = request_assembler::assemble(&session.draft)?;

            let transition = session.transition_to(SubmissionState::HealthChecking);
            tracing::info!(
                session_id = %session_id,
                old_state = ?transition.old_state,
                "Submission started"
            );

            (request, session.draft.clone(), session.user_id.clone())
        };

        // Health probe (lock released)
        if !self.prediction.check_health().await {
            let message = "Prediction service is not available. Please try again.".to_string();
            self.fail_if_live(session_id, SubmissionState::HealthChecking, &message)
                .await;
            return Err(AnalysisError::ServiceUnavailable(message).into());
        }

        // HEALTH_CHECKING → PREDICTING, unless the session was abandoned
        {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(&session_id) {
                Some(session) if session.state == SubmissionState::HealthChecking => {
                    session.transition_to(SubmissionState::Predicting);
                }
                _ => {
                    tracing::warn!(session_id = %session_id, "Session gone before predict; submission dropped");
                    return Err(ApiError::NotFound(format!(
                        "Analysis session not found: {}",
                        session_id
                    )));
                }
            }
        }

        let prediction = match self.prediction.predict(&request).await {
            Ok(prediction) => prediction,
            Err(e) => {
                let message = e.to_string();
                self.fail_if_live(session_id, SubmissionState::Predicting, &message)
                    .await;
                return Err(e.into());
            }
        };

        // Liveness check before recording the result **[CID-WF-030]**
        {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(&session_id) {
                Some(session) if session.state == SubmissionState::Predicting => {
                    session.succeed(prediction.clone());
                }
                _ => {
                    tracing::warn!(
                        session_id = %session_id,
                        "Session abandoned during predict; result discarded"
                    );
                    return Err(ApiError::NotFound(format!(
                        "Analysis session not found: {}",
                        session_id
                    )));
                }
            }
        }

        // Auto-persist; failure is logged and surfaced as a notice, never
        // as a blocking error
        let record = AnalysisRecord::from_result(&user_id, &draft, &prediction);
        let (saved, save_notice) = match db::analyses::insert_analysis(&self.db, &record).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %session_id,
                    record_id = %record.id,
                    "Analysis saved to history"
                );
                (true, None)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "History save failed; result still returned"
                );
                (false, Some(format!("Analysis could not be saved to history: {}", e)))
            }
        };

        Ok(SubmitOutcome {
            session_id,
            state: SubmissionState::Succeeded,
            confidence_level: prediction.confidence_level(),
            result: prediction,
            saved,
            save_notice,
        })
    }

    /// Mark a submission failed, unless the session was abandoned
    async fn fail_if_live(&self, session_id: Uuid, expected: SubmissionState, message: &str) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(session) if session.state == expected => {
                session.fail(message.to_string());
                tracing::warn!(session_id = %session_id, error = %message, "Submission failed");
            }
            _ => {
                tracing::warn!(session_id = %session_id, "Session gone; failure discarded");
            }
        }
    }

    /// Number of live sessions (diagnostics)
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
