//! Persisted analysis record
//!
//! **[CID-DB-010]** Denormalized history row, created exactly once per
//! completed analysis and never mutated. Deletable only through bulk
//! per-user deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnalysisDraft, PredictionResponse};

/// One row of the `analyses` history table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: String,
    /// Selected characteristics, insertion order preserved
    pub characteristics: Vec<String>,
    /// Human-readable medium label (not the normalized code)
    pub culture_medium: String,
    /// Colony age wire form ("24h", "48h", "72h", "96h")
    pub colony_age: String,
    /// Signed URL of the sample image at analysis time
    pub image_url: String,
    /// Predicted organism label
    pub result: String,
    /// Confidence as a fraction in 0..1 (service reports a percentage)
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Build the history row for a completed analysis
    ///
    /// The draft must have satisfied every stage gate; missing fields here
    /// indicate an orchestration bug, so they surface as empty strings
    /// rather than a second validation pass.
    pub fn from_result(user_id: &str, draft: &AnalysisDraft, result: &PredictionResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            characteristics: draft.characteristics.clone(),
            culture_medium: draft.culture_medium.clone().unwrap_or_default(),
            colony_age: draft
                .colony_age
                .map(|age| age.as_str().to_string())
                .unwrap_or_default(),
            image_url: draft.sample_image_ref.clone().unwrap_or_default(),
            result: result.result.clone(),
            confidence: result.confidence / 100.0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColonyAge;

    #[test]
    fn test_record_stores_confidence_as_fraction() {
        let mut draft = AnalysisDraft::new();
        draft.toggle_characteristic("Gram Negative bacilli").unwrap();
        draft.toggle_characteristic("Oxidase positive").unwrap();
        draft.select_medium("Ashdown Agar").unwrap();
        draft
            .set_sample_image_ref("https://storage.example/signed.jpg".to_string())
            .unwrap();
        draft.set_colony_age(ColonyAge::H48).unwrap();

        let response = PredictionResponse::sample();
        let record = AnalysisRecord::from_result("user-1", &draft, &response);

        assert_eq!(record.user_id, "user-1");
        assert_eq!(record.culture_medium, "Ashdown Agar");
        assert_eq!(record.colony_age, "48h");
        assert!((record.confidence - 0.92).abs() < 1e-9);
        assert_eq!(record.characteristics.len(), 2);
    }
}
