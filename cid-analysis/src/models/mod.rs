//! Data models for the analysis pipeline

mod draft;
mod prediction;
mod record;
mod session;

pub use draft::{
    AnalysisDraft, AnalysisStage, ColonyAge, CULTURE_MEDIA, OPTIONAL_CHARACTERISTICS,
    REQUIRED_CHARACTERISTICS,
};
pub use prediction::{
    ConfidenceLevel, PredictPayload, PredictionMetadata, PredictionRequest, PredictionResponse,
};
pub use record::AnalysisRecord;
pub use session::{AnalysisSession, StateTransition, SubmissionState};
