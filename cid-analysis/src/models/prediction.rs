//! Prediction request/response contract
//!
//! **[CID-INT-010]** Wire types for the external ML prediction service,
//! plus the derived confidence-level bucket shown alongside a result.

use serde::{Deserialize, Serialize};

/// Normalized prediction request, constructed once per submission
///
/// `agar` carries the canonical short medium code (e.g. "Ashdown"),
/// not the human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub image_uri: String,
    pub agar: String,
    pub colony_age: String,
    pub characteristics: Vec<String>,
}

/// POST /predict request body
///
/// The image is transcoded to base64 regardless of where the bytes came
/// from (signed URL or local file).
#[derive(Debug, Serialize)]
pub struct PredictPayload {
    pub image: String,
    pub agar: String,
    pub colony_age: String,
    pub characteristics: Vec<String>,
}

/// Prediction service response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted organism label
    pub result: String,
    /// Confidence percentage (0-100)
    pub confidence: f64,
    /// True when the target organism (B. pseudomallei) was identified
    pub is_bpseudo: bool,
    /// Echo of the analysis inputs as the model saw them
    pub metadata: PredictionMetadata,
    /// Clinical interpretation text
    pub interpretation: String,
    /// Recommended follow-up actions, in order
    pub recommendations: Vec<String>,
}

/// Metadata section of a prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionMetadata {
    pub agar: String,
    pub colony_age: String,
    pub time_hours: f64,
    pub characteristics: Vec<String>,
}

/// Derived confidence bucket, computed from the confidence percentage
///
/// Single labeling scheme used everywhere: >= 90 Very High, >= 70 High,
/// >= 50 Low, else Very Low. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

impl ConfidenceLevel {
    /// Bucket a confidence percentage (0-100)
    pub fn from_percent(confidence: f64) -> Self {
        if confidence >= 90.0 {
            ConfidenceLevel::VeryHigh
        } else if confidence >= 70.0 {
            ConfidenceLevel::High
        } else if confidence >= 50.0 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High",
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::VeryLow => "Very Low",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PredictionResponse {
    /// Derived confidence bucket for display
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_percent(self.confidence)
    }
}

#[cfg(test)]
impl PredictionResponse {
    /// Representative response for unit tests
    pub fn sample() -> Self {
        Self {
            result: "B. pseudomallei".to_string(),
            confidence: 92.0,
            is_bpseudo: true,
            metadata: PredictionMetadata {
                agar: "Ashdown".to_string(),
                colony_age: "48h".to_string(),
                time_hours: 48.0,
                characteristics: vec![
                    "Gram Negative bacilli".to_string(),
                    "Oxidase positive".to_string(),
                ],
            },
            interpretation: "Colony morphology consistent with B. pseudomallei".to_string(),
            recommendations: vec!["Confirm with PCR".to_string()],
        }
    }
}
