//! Pipeline services

pub mod analysis_orchestrator;
pub mod prediction_client;
pub mod request_assembler;
pub mod storage_client;

pub use analysis_orchestrator::{AnalysisOrchestrator, SubmitOutcome};
pub use prediction_client::PredictionClient;
pub use storage_client::StorageClient;
