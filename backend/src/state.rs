use shared::{ChestLabel, TumorLabel};
use std::sync::Arc;
use tch::Device;

use crate::inference::{Architecture, ModelLoadError, ModelsConfig, Pipeline};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Read-only state built once at startup and shared by every worker.
pub struct AppState {
    pub brain_tumor: Arc<Pipeline<TumorLabel>>,
    pub pneumonia: Arc<Pipeline<ChestLabel>>,
    pub device: Device,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn load(
        config: &ModelsConfig,
        device: Device,
        max_upload_bytes: usize,
    ) -> Result<Self, ModelLoadError> {
        let brain_tumor = Pipeline::load(
            "brain-tumor",
            Architecture::ResNet18Binary,
            &config.brain_tumor,
            device,
        )?;
        let pneumonia = Pipeline::load(
            "pneumonia",
            Architecture::ChestCnn,
            &config.pneumonia,
            device,
        )?;
        Ok(Self::new(brain_tumor, pneumonia, device, max_upload_bytes))
    }

    pub fn new(
        brain_tumor: Pipeline<TumorLabel>,
        pneumonia: Pipeline<ChestLabel>,
        device: Device,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            brain_tumor: Arc::new(brain_tumor),
            pneumonia: Arc::new(pneumonia),
            device,
            max_upload_bytes,
        }
    }

    pub fn model_names(&self) -> Vec<String> {
        vec![
            self.brain_tumor.name().to_string(),
            self.pneumonia.name().to_string(),
        ]
    }
}
