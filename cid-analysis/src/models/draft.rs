//! Analysis draft and wizard stage gating
//!
//! **[CID-WF-010]** A draft accumulates the four analysis inputs across
//! wizard stages: CHARACTERISTICS → MEDIUM → CAPTURE → COLONY_AGE → READY.
//! Each stage has a gate that must pass before the draft may advance.

use cid_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Characteristics that must be selected before the draft may advance
/// past the CHARACTERISTICS stage
pub const REQUIRED_CHARACTERISTICS: [&str; 2] =
    ["Gram Negative bacilli", "Oxidase positive"];

/// Characteristics that refine the analysis but never block advancement
pub const OPTIONAL_CHARACTERISTICS: [&str; 1] = ["Bipolar appearance"];

/// Culture media offered to the technician (human-readable labels)
pub const CULTURE_MEDIA: [&str; 4] = [
    "Blood Agar",
    "MacConkey Agar",
    "Nutrient Agar",
    "Ashdown Agar",
];

/// **[CID-WF-010]** Incubation time bucket for the sampled colony
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColonyAge {
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "48h")]
    H48,
    #[serde(rename = "72h")]
    H72,
    #[serde(rename = "96h")]
    H96,
}

impl ColonyAge {
    /// Wire representation expected by the prediction service
    pub fn as_str(&self) -> &'static str {
        match self {
            ColonyAge::H24 => "24h",
            ColonyAge::H48 => "48h",
            ColonyAge::H72 => "72h",
            ColonyAge::H96 => "96h",
        }
    }

    /// Elapsed incubation hours
    pub fn hours(&self) -> u32 {
        match self {
            ColonyAge::H24 => 24,
            ColonyAge::H48 => 48,
            ColonyAge::H72 => 72,
            ColonyAge::H96 => 96,
        }
    }
}

/// **[CID-WF-010]** Wizard stage for an analysis draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStage {
    /// Observational tag selection (required-subset gate)
    Characteristics,
    /// Culture medium selection (single-choice gate)
    Medium,
    /// Sample image capture and upload (retrievable reference gate)
    Capture,
    /// Colony age selection
    ColonyAge,
    /// All inputs collected; draft may be submitted
    Ready,
}

impl AnalysisStage {
    /// Next stage in the forward-only progression
    pub fn next(&self) -> Option<AnalysisStage> {
        match self {
            AnalysisStage::Characteristics => Some(AnalysisStage::Medium),
            AnalysisStage::Medium => Some(AnalysisStage::Capture),
            AnalysisStage::Capture => Some(AnalysisStage::ColonyAge),
            AnalysisStage::ColonyAge => Some(AnalysisStage::Ready),
            AnalysisStage::Ready => None,
        }
    }
}

/// **[CID-WF-010]** Mutable, session-scoped analysis input accumulator
///
/// Owned exclusively by one analysis session; destroyed when the session
/// completes or is abandoned. Frozen (read-only) once a submission succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDraft {
    /// Selected observational tags, insertion order preserved for display
    /// and persistence
    pub characteristics: Vec<String>,

    /// Selected culture medium label; None means "unselected"
    pub culture_medium: Option<String>,

    /// Signed retrieval URL for the uploaded sample image; populated only
    /// after a successful upload
    pub sample_image_ref: Option<String>,

    /// Selected incubation age bucket
    pub colony_age: Option<ColonyAge>,

    /// Current wizard stage
    pub stage: AnalysisStage,

    /// Set once a submission has succeeded; all mutation is rejected
    pub frozen: bool,
}

impl Default for AnalysisDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisDraft {
    /// Create an empty draft at the CHARACTERISTICS stage
    pub fn new() -> Self {
        Self {
            characteristics: Vec::new(),
            culture_medium: None,
            sample_image_ref: None,
            colony_age: None,
            stage: AnalysisStage::Characteristics,
            frozen: false,
        }
    }

    fn check_mutable(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::InvalidInput(
                "Draft already submitted; start a new analysis".to_string(),
            ));
        }
        Ok(())
    }

    /// Flip membership of an observational tag
    ///
    /// Toggling is always valid; insertion order of the remaining tags is
    /// preserved.
    pub fn toggle_characteristic(&mut self, tag: &str) -> Result<()> {
        self.check_mutable()?;
        if let Some(pos) = self.characteristics.iter().position(|c| c == tag) {
            self.characteristics.remove(pos);
        } else {
            self.characteristics.push(tag.to_string());
        }
        Ok(())
    }

    /// Single-choice medium selection with toggle semantics
    ///
    /// Selecting the currently-selected medium clears the selection;
    /// selecting a different medium replaces it. Unknown labels are
    /// rejected (the medium list is closed).
    pub fn select_medium(&mut self, medium: &str) -> Result<()> {
        self.check_mutable()?;
        if !CULTURE_MEDIA.contains(&medium) {
            return Err(Error::InvalidInput(format!(
                "Unknown culture medium: {}",
                medium
            )));
        }
        if self.culture_medium.as_deref() == Some(medium) {
            self.culture_medium = None;
        } else {
            self.culture_medium = Some(medium.to_string());
        }
        Ok(())
    }

    /// Attach the signed URL of a successfully uploaded sample image
    pub fn set_sample_image_ref(&mut self, signed_url: String) -> Result<()> {
        self.check_mutable()?;
        self.sample_image_ref = Some(signed_url);
        Ok(())
    }

    /// Select the colony age bucket
    pub fn set_colony_age(&mut self, age: ColonyAge) -> Result<()> {
        self.check_mutable()?;
        self.colony_age = Some(age);
        Ok(())
    }

    /// True iff every required characteristic is selected
    ///
    /// Optional characteristics never block.
    pub fn required_characteristics_satisfied(&self) -> bool {
        REQUIRED_CHARACTERISTICS
            .iter()
            .all(|required| self.characteristics.iter().any(|c| c == required))
    }

    /// Gate check for the current stage
    pub fn can_advance(&self) -> bool {
        match self.stage {
            AnalysisStage::Characteristics => self.required_characteristics_satisfied(),
            AnalysisStage::Medium => self.culture_medium.is_some(),
            AnalysisStage::Capture => self.sample_image_ref.is_some(),
            AnalysisStage::ColonyAge => self.colony_age.is_some(),
            AnalysisStage::Ready => false,
        }
    }

    /// Advance to the next stage if the current gate passes
    pub fn advance(&mut self) -> Result<AnalysisStage> {
        self.check_mutable()?;
        if !self.can_advance() {
            return Err(Error::InvalidInput(match self.stage {
                AnalysisStage::Characteristics => {
                    "All required characteristics must be selected".to_string()
                }
                AnalysisStage::Medium => "A culture medium must be selected".to_string(),
                AnalysisStage::Capture => {
                    "A sample image must be captured and uploaded".to_string()
                }
                AnalysisStage::ColonyAge => "A colony age must be selected".to_string(),
                AnalysisStage::Ready => "Draft is already complete".to_string(),
            }));
        }
        // can_advance is false at READY, so next() cannot be None here
        self.stage = self
            .stage
            .next()
            .ok_or_else(|| Error::Internal("No stage after READY".to_string()))?;
        Ok(self.stage)
    }

    /// Freeze the draft after a successful submission
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}
