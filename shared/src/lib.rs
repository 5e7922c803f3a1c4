use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Two-valued outcome of a binary classifier.
pub trait BinaryLabel: Copy + Send + Sync + std::fmt::Display + 'static {
    fn from_positive(positive: bool) -> Self;
    fn is_positive(&self) -> bool;

    fn finding(&self) -> Finding {
        if self.is_positive() {
            Finding::Positive
        } else {
            Finding::Negative
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum TumorLabel {
    #[strum(serialize = "Tumor Detected")]
    TumorDetected,
    #[strum(serialize = "No Tumor Found")]
    NoTumorFound,
}

impl BinaryLabel for TumorLabel {
    fn from_positive(positive: bool) -> Self {
        if positive {
            TumorLabel::TumorDetected
        } else {
            TumorLabel::NoTumorFound
        }
    }

    fn is_positive(&self) -> bool {
        matches!(self, TumorLabel::TumorDetected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ChestLabel {
    #[strum(serialize = "PNEUMONIA")]
    Pneumonia,
    #[strum(serialize = "NORMAL")]
    Normal,
}

impl BinaryLabel for ChestLabel {
    fn from_positive(positive: bool) -> Self {
        if positive {
            ChestLabel::Pneumonia
        } else {
            ChestLabel::Normal
        }
    }

    fn is_positive(&self) -> bool {
        matches!(self, ChestLabel::Pneumonia)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Finding {
    Positive,
    Negative,
}

/// Box in percent-of-image units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedArea {
    pub region: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainTumorResponse {
    pub result: Finding,
    pub confidence: f32,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PneumoniaResponse {
    pub result: Finding,
    pub confidence: f32,
    pub affected_areas: Vec<AffectedArea>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub device: String,
    pub models: Vec<String>,
}
