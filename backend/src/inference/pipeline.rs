use shared::BinaryLabel;
use std::marker::PhantomData;
use tch::Device;

use super::config::{PipelineConfig, PreprocessConfig};
use super::model::{InferenceError, Model, ModelLoadError};
use super::networks::Architecture;
use super::preprocess::{self, DecodeError, NormalizeError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult<L> {
    pub label: L,
    /// `max(p, 1 - p) * 100`: distance from the decision boundary, not a calibrated estimate.
    pub confidence_percent: f32,
    pub raw_probability: f32,
}

impl<L: BinaryLabel> PredictionResult<L> {
    pub fn from_probability(probability: f32) -> Self {
        Self {
            label: L::from_positive(probability > 0.5),
            confidence_percent: probability.max(1.0 - probability) * 100.0,
            raw_probability: probability,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// decode → normalize → classify for one binary diagnosis.
pub struct Pipeline<L> {
    model: Model,
    preprocess: PreprocessConfig,
    _label: PhantomData<fn() -> L>,
}

impl<L: BinaryLabel> Pipeline<L> {
    pub fn new(model: Model, preprocess: PreprocessConfig) -> Self {
        Self {
            model,
            preprocess,
            _label: PhantomData,
        }
    }

    pub fn load(
        name: &'static str,
        architecture: Architecture,
        config: &PipelineConfig,
        device: Device,
    ) -> Result<Self, ModelLoadError> {
        let model = Model::load(name, architecture, config, device)?;
        Ok(Self::new(model, config.preprocess.clone()))
    }

    pub fn name(&self) -> &'static str {
        self.model.name()
    }

    pub fn predict(&self, image_bytes: &[u8]) -> Result<PredictionResult<L>, PipelineError> {
        let image = preprocess::decode(image_bytes)?;
        let tensor = preprocess::normalize(&image, &self.preprocess)?;
        let probability = self.model.probability(&tensor)?;
        log::debug!(
            "{} forward pass: {}x{} input, p = {:.6}",
            self.name(),
            image.width(),
            image.height(),
            probability
        );
        Ok(PredictionResult::from_probability(probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png_bytes, stub_model};
    use shared::{ChestLabel, TumorLabel};
    use tch::nn;

    #[test]
    fn confidence_stays_within_fifty_and_hundred() {
        for probability in [0.0f32, 0.001, 0.25, 0.5, 0.5001, 0.75, 0.999, 1.0] {
            let result = PredictionResult::<TumorLabel>::from_probability(probability);
            assert!((50.0..=100.0).contains(&result.confidence_percent), "{}", probability);
            assert_eq!(result.raw_probability, probability);
        }
    }

    #[test]
    fn threshold_is_strictly_above_half() {
        let at_boundary = PredictionResult::<ChestLabel>::from_probability(0.5);
        assert_eq!(at_boundary.label, ChestLabel::Normal);
        assert_eq!(at_boundary.confidence_percent, 50.0);

        let above = PredictionResult::<ChestLabel>::from_probability(0.8);
        assert_eq!(above.label, ChestLabel::Pneumonia);
        assert!((above.confidence_percent - 80.0).abs() < 1e-4);

        let below = PredictionResult::<TumorLabel>::from_probability(0.1);
        assert_eq!(below.label, TumorLabel::NoTumorFound);
        assert!((below.confidence_percent - 90.0).abs() < 1e-4);
    }

    #[test]
    fn predict_runs_every_stage() {
        let pipeline: Pipeline<TumorLabel> =
            Pipeline::new(stub_model(3.0, [3, 224, 224]), PreprocessConfig::brain_tumor());
        let result = pipeline.predict(&png_bytes(50, 40, [120, 60, 30])).unwrap();
        assert_eq!(result.label, TumorLabel::TumorDetected);
        assert!(result.confidence_percent > 95.0);
    }

    #[test]
    fn undecodable_bytes_fail_in_decode_stage() {
        let pipeline: Pipeline<ChestLabel> =
            Pipeline::new(stub_model(0.0, [1, 256, 256]), PreprocessConfig::pneumonia());
        let err = pipeline.predict(b"GIF89a-not-really").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn config_model_mismatch_fails_in_inference_stage() {
        let pipeline: Pipeline<ChestLabel> =
            Pipeline::new(stub_model(0.0, [3, 224, 224]), PreprocessConfig::pneumonia());
        let err = pipeline.predict(&png_bytes(8, 8, [1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Inference(InferenceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn repeated_predictions_are_bit_identical() {
        let preprocess = PreprocessConfig {
            width: 64,
            height: 64,
            ..PreprocessConfig::pneumonia()
        };
        let vs = nn::VarStore::new(Device::Cpu);
        let network = Architecture::ChestCnn.build(&vs.root(), &preprocess).unwrap();
        let model = Model::from_module("pneumonia", network, Device::Cpu, preprocess.input_shape());
        let pipeline: Pipeline<ChestLabel> = Pipeline::new(model, preprocess);

        let bytes = png_bytes(90, 70, [200, 180, 160]);
        let first = pipeline.predict(&bytes).unwrap();
        let second = pipeline.predict(&bytes).unwrap();
        assert_eq!(
            first.raw_probability.to_bits(),
            second.raw_probability.to_bits()
        );
        assert_eq!(first, second);
    }
}
