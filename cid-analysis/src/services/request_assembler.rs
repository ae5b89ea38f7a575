//! Request assembly and validation
//!
//! **[CID-VAL-010]** Combines the four draft artifacts into one normalized
//! prediction request. Validation here is defense-in-depth on top of the
//! wizard stage gates; a violation never reaches the network.

use crate::error::AnalysisError;
use crate::models::{AnalysisDraft, PredictionRequest};

/// Medium-label normalization table (human label → canonical short code)
const MEDIUM_CODES: [(&str, &str); 4] = [
    ("Blood Agar", "Blood"),
    ("MacConkey Agar", "Macconkey"),
    ("Nutrient Agar", "Nutrient"),
    ("Ashdown Agar", "Ashdown"),
];

/// Normalize a culture-medium label to the code the model expects
///
/// Best-effort: unrecognized labels pass through unchanged and never
/// block submission. Idempotent (codes are not themselves labels).
pub fn normalize_medium(label: &str) -> String {
    MEDIUM_CODES
        .iter()
        .find(|(human, _)| *human == label)
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| label.to_string())
}

/// Assemble a prediction request from a completed draft
///
/// **[CID-VAL-010]** Every input must be present and non-empty:
/// image reference, medium, colony age, and at least one characteristic.
pub fn assemble(draft: &AnalysisDraft) -> Result<PredictionRequest, AnalysisError> {
    let image_uri = draft
        .sample_image_ref
        .as_deref()
        .filter(|uri| !uri.trim().is_empty())
        .ok_or_else(|| AnalysisError::Validation("Sample image is required".to_string()))?;

    let culture_medium = draft
        .culture_medium
        .as_deref()
        .filter(|medium| !medium.trim().is_empty())
        .ok_or_else(|| AnalysisError::Validation("Culture medium is required".to_string()))?;

    let colony_age = draft
        .colony_age
        .ok_or_else(|| AnalysisError::Validation("Colony age is required".to_string()))?;

    if draft.characteristics.is_empty() {
        return Err(AnalysisError::Validation(
            "At least one characteristic is required".to_string(),
        ));
    }

    Ok(PredictionRequest {
        image_uri: image_uri.to_string(),
        agar: normalize_medium(culture_medium),
        colony_age: colony_age.as_str().to_string(),
        characteristics: draft.characteristics.clone(),
    })
}
