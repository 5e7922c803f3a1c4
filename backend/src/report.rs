//! Maps predictions onto the endpoint response envelopes.
//!
//! The positive-case annotations below are fixed placeholders. Neither network localizes
//! anything, so `regions` and `affectedAreas` are not derived from the uploaded image and
//! must not be presented as findings.

use shared::{
    AffectedArea, BinaryLabel, BrainTumorResponse, ChestLabel, PneumoniaResponse, Region, Severity,
    TumorLabel,
};

use crate::inference::PredictionResult;

/// Placeholder box, in percent-of-image units.
pub const TUMOR_REGION: Region = Region {
    x: 30,
    y: 40,
    width: 20,
    height: 15,
};

/// Placeholder areas, always reported in this order.
pub const PNEUMONIA_AREAS: [(&str, Severity); 2] = [
    ("Lower Right Lung", Severity::Moderate),
    ("Upper Left Lung", Severity::Mild),
];

/// `max(p, 1 - p)` as a percentage rounded to two decimals, expressed as a fraction in
/// `[0, 1]`. Computed in f64 and rounded on the exact decimal expansion.
pub fn confidence_fraction(probability: f32) -> f32 {
    let probability = f64::from(probability);
    let percent = probability.max(1.0 - probability) * 100.0;
    let rounded = format!("{:.2}", percent).parse::<f64>().unwrap_or(percent);
    (rounded / 100.0) as f32
}

pub fn brain_tumor(prediction: &PredictionResult<TumorLabel>) -> BrainTumorResponse {
    let regions = if prediction.label.is_positive() {
        vec![TUMOR_REGION]
    } else {
        Vec::new()
    };
    BrainTumorResponse {
        result: prediction.label.finding(),
        confidence: confidence_fraction(prediction.raw_probability),
        regions,
    }
}

pub fn pneumonia(prediction: &PredictionResult<ChestLabel>) -> PneumoniaResponse {
    let affected_areas = if prediction.label.is_positive() {
        PNEUMONIA_AREAS
            .iter()
            .map(|(region, severity)| AffectedArea {
                region: region.to_string(),
                severity: *severity,
            })
            .collect()
    } else {
        Vec::new()
    };
    PneumoniaResponse {
        result: prediction.label.finding(),
        confidence: confidence_fraction(prediction.raw_probability),
        affected_areas,
    }
}
