//! Submission state machine
//!
//! **[CID-WF-020]** Each submission progresses through defined states:
//! IDLE → HEALTH_CHECKING → PREDICTING → {SUCCEEDED | FAILED}
//!
//! FAILED is re-entrant: an explicit retry transitions back to
//! HEALTH_CHECKING. There is no automatic retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnalysisDraft, PredictionResponse};

/// **[CID-WF-020]** Submission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    /// No submission attempted yet
    Idle,
    /// Probing the prediction service
    HealthChecking,
    /// Prediction request in flight
    Predicting,
    /// Prediction received and displayed (terminal)
    Succeeded,
    /// Submission failed; explicit retry required
    Failed,
}

/// **[CID-WF-020]** State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SubmissionState,
    pub new_state: SubmissionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Analysis session (in-memory state)
///
/// Owns exactly one draft. Independent of every other session; no state
/// is shared across concurrent sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Owner of the session (history records are scoped to this id)
    pub user_id: String,

    /// Accumulated analysis inputs
    pub draft: AnalysisDraft,

    /// Current submission state
    pub state: SubmissionState,

    /// Prediction result, present once SUCCEEDED
    pub result: Option<PredictionResponse>,

    /// Last submission error message, present while FAILED
    pub error: Option<String>,

    /// Session creation time
    pub started_at: DateTime<Utc>,

    /// Time the session reached SUCCEEDED (if it has)
    pub ended_at: Option<DateTime<Utc>>,
}

impl AnalysisSession {
    /// Create a new session with an empty draft
    pub fn new(user_id: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            draft: AnalysisDraft::new(),
            state: SubmissionState::Idle,
            result: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new submission state
    pub fn transition_to(&mut self, new_state: SubmissionState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state == SubmissionState::Succeeded {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// True while a submission is between entry and a terminal state
    ///
    /// A second submission is rejected while this holds, so at most one
    /// prediction request is in flight per session.
    pub fn in_flight(&self) -> bool {
        matches!(
            self.state,
            SubmissionState::HealthChecking | SubmissionState::Predicting
        )
    }

    /// True once the session has produced its one analysis record
    pub fn is_complete(&self) -> bool {
        self.state == SubmissionState::Succeeded
    }

    /// True iff a submission may be started from the current state
    ///
    /// IDLE starts the first attempt; FAILED is the explicit retry
    /// transition back to HEALTH_CHECKING.
    pub fn can_submit(&self) -> bool {
        matches!(self.state, SubmissionState::Idle | SubmissionState::Failed)
    }

    /// Record a failed submission
    pub fn fail(&mut self, message: String) -> StateTransition {
        self.error = Some(message);
        self.transition_to(SubmissionState::Failed)
    }

    /// Record a successful prediction
    pub fn succeed(&mut self, result: PredictionResponse) -> StateTransition {
        self.result = Some(result);
        self.error = None;
        self.draft.freeze();
        self.transition_to(SubmissionState::Succeeded)
    }
}
