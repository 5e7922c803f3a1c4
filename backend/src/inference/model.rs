use ndarray::Array3;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Mutex;
use tch::nn::{self, ModuleT};
use tch::{CModule, Device, Kind, TchError, Tensor};

use super::config::{PipelineConfig, WeightFormat};
use super::networks::Architecture;

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Weight file {0} does not exist")]
    Missing(PathBuf),
    #[error("Failed to load weights from {path}: {source}")]
    Torch {
        path: PathBuf,
        #[source]
        source: TchError,
    },
    #[error("Incompatible model configuration: {0}")]
    Incompatible(String),
    #[error("Unknown device {0:?}, expected auto, cpu, mps, cuda or cuda:<index>")]
    Device(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Input shape {actual:?} does not match model input {expected:?}")]
    ShapeMismatch { expected: [i64; 3], actual: Vec<usize> },
    #[error("Model produced {0} outputs, expected a single logit")]
    UnexpectedOutput(usize),
    #[error("Torch error: {0}")]
    Torch(#[from] TchError),
    #[error("Forward pass aborted: {0}")]
    Runtime(String),
    #[error("Model produced a non-finite probability ({0})")]
    NonFinite(f32),
    #[error("Model lock poisoned")]
    Poisoned,
}

/// Parses a device name; `auto` picks CUDA when available.
pub fn select_device(name: &str) -> Result<Device, ModelLoadError> {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "auto" => Ok(Device::cuda_if_available()),
        "cpu" => Ok(Device::Cpu),
        "mps" => Ok(Device::Mps),
        "cuda" => Ok(Device::Cuda(0)),
        other => other
            .strip_prefix("cuda:")
            .and_then(|index| index.parse().ok())
            .map(Device::Cuda)
            .ok_or_else(|| ModelLoadError::Device(other.to_string())),
    }
}

/// A frozen single-logit network bound to one device.
pub struct Model {
    name: &'static str,
    network: Mutex<Box<dyn ModuleT + Send>>,
    device: Device,
    input_shape: [i64; 3],
}

impl Model {
    pub fn load(
        name: &'static str,
        architecture: Architecture,
        config: &PipelineConfig,
        device: Device,
    ) -> Result<Self, ModelLoadError> {
        let path = &config.weights;
        if !path.exists() {
            return Err(ModelLoadError::Missing(path.clone()));
        }
        let torch_error = |source| ModelLoadError::Torch {
            path: path.clone(),
            source,
        };

        let network: Box<dyn ModuleT + Send> = match config.format {
            WeightFormat::Weights => {
                let mut vs = nn::VarStore::new(device);
                let network = architecture.build(&vs.root(), &config.preprocess)?;
                vs.load(path).map_err(torch_error)?;
                vs.freeze();
                network
            }
            WeightFormat::TorchScript => {
                let mut module = CModule::load_on_device(path, device).map_err(torch_error)?;
                module.set_eval();
                Box::new(module)
            }
        };

        let input_shape = config.preprocess.input_shape();
        log::info!(
            "Loaded {} model from {} ({:?}, input {:?}) on {:?}",
            name,
            path.display(),
            config.format,
            input_shape,
            device
        );
        Ok(Self::from_module(name, network, device, input_shape))
    }

    pub fn from_module(
        name: &'static str,
        network: Box<dyn ModuleT + Send>,
        device: Device,
        input_shape: [i64; 3],
    ) -> Self {
        Self {
            name,
            network: Mutex::new(network),
            device,
            input_shape,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs one evaluation-mode forward pass and returns `sigmoid(logit)`.
    pub fn probability(&self, input: &Array3<f32>) -> Result<f32, InferenceError> {
        let actual = input.shape();
        if actual
            .iter()
            .zip(self.input_shape)
            .any(|(&actual, expected)| actual as i64 != expected)
        {
            return Err(InferenceError::ShapeMismatch {
                expected: self.input_shape,
                actual: actual.to_vec(),
            });
        }

        let values: Vec<f32> = input.iter().copied().collect();
        let output = {
            let network = self.network.lock().map_err(|_| InferenceError::Poisoned)?;
            panic::catch_unwind(AssertUnwindSafe(|| {
                let batch = Tensor::from_slice(&values)
                    .view(self.input_shape)
                    .unsqueeze(0)
                    .to_device(self.device);
                tch::no_grad(|| network.forward_t(&batch, false))
                    .sigmoid()
                    .to_kind(Kind::Float)
                    .to_device(Device::Cpu)
            }))
            .map_err(|payload| InferenceError::Runtime(panic_message(payload.as_ref())))?
        };

        let probabilities = Vec::<f32>::try_from(&output.view([-1]))?;
        match probabilities.as_slice() {
            [probability] if probability.is_finite() => Ok(*probability),
            [probability] => Err(InferenceError::NonFinite(*probability)),
            other => Err(InferenceError::UnexpectedOutput(other.len())),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown libtorch failure".to_string())
}
