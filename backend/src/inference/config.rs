use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read model config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse model config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid preprocessing for {pipeline}: {reason}")]
    Invalid {
        pipeline: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Rgb,
    Grayscale,
}

impl ChannelMode {
    pub fn count(self) -> usize {
        match self {
            ChannelMode::Rgb => 3,
            ChannelMode::Grayscale => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// How the weight file was exported from training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightFormat {
    /// Named tensors (`.safetensors`, `.ot`, `.pt`) for a network defined in this crate.
    #[default]
    Weights,
    /// A traced or scripted TorchScript module.
    TorchScript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    pub channels: ChannelMode,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    #[serde(default)]
    pub resize_filter: ResizeFilter,
}

impl PreprocessConfig {
    pub fn brain_tumor() -> Self {
        Self {
            width: 224,
            height: 224,
            channels: ChannelMode::Rgb,
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
            resize_filter: ResizeFilter::Triangle,
        }
    }

    pub fn pneumonia() -> Self {
        Self {
            width: 256,
            height: 256,
            channels: ChannelMode::Grayscale,
            mean: vec![0.485],
            std: vec![0.229],
            resize_filter: ResizeFilter::Triangle,
        }
    }

    /// Tensor shape in `C×H×W` order, without the batch dimension.
    pub fn input_shape(&self) -> [i64; 3] {
        [
            self.channels.count() as i64,
            i64::from(self.height),
            i64::from(self.width),
        ]
    }

    pub fn validate(&self, pipeline: &'static str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid { pipeline, reason };
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "target size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        let channels = self.channels.count();
        if self.mean.len() != channels || self.std.len() != channels {
            return Err(invalid(format!(
                "expected {} mean/std values, got {}/{}",
                channels,
                self.mean.len(),
                self.std.len()
            )));
        }
        if let Some(std) = self.std.iter().find(|s| !(**s > 0.0)) {
            return Err(invalid(format!("std values must be positive, got {}", std)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub weights: PathBuf,
    #[serde(default)]
    pub format: WeightFormat,
    pub preprocess: PreprocessConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub brain_tumor: PipelineConfig,
    pub pneumonia: PipelineConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            brain_tumor: PipelineConfig {
                weights: PathBuf::from("models/tumor_classification_resnet18.safetensors"),
                format: WeightFormat::Weights,
                preprocess: PreprocessConfig::brain_tumor(),
            },
            pneumonia: PipelineConfig {
                weights: PathBuf::from("models/chest_xray_model.safetensors"),
                format: WeightFormat::Weights,
                preprocess: PreprocessConfig::pneumonia(),
            },
        }
    }
}

impl ModelsConfig {
    /// Reads the YAML model config, falling back to the built-in defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Model config {} not found, using built-in defaults",
                path.display()
            );
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded model config from {}", path.display());
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        let config: ModelsConfig = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.brain_tumor.preprocess.validate("brain_tumor")?;
        self.pneumonia.preprocess.validate("pneumonia")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
brain_tumor:
  weights: weights/resnet18.pt
  format: torchscript
  preprocess:
    width: 224
    height: 224
    channels: rgb
    mean: [0.485, 0.456, 0.406]
    std: [0.229, 0.224, 0.225]
pneumonia:
  weights: weights/chest.safetensors
  preprocess:
    width: 128
    height: 128
    channels: grayscale
    mean: [0.5]
    std: [0.25]
    resize_filter: lanczos3
"#;

    #[test]
    fn defaults_match_trained_networks() {
        let config = ModelsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.brain_tumor.preprocess.input_shape(), [3, 224, 224]);
        assert_eq!(config.pneumonia.preprocess.input_shape(), [1, 256, 256]);
    }

    #[test]
    fn parses_yaml_with_optional_fields() {
        let config = ModelsConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.brain_tumor.format, WeightFormat::TorchScript);
        assert_eq!(config.brain_tumor.preprocess.resize_filter, ResizeFilter::Triangle);
        assert_eq!(config.pneumonia.format, WeightFormat::Weights);
        assert_eq!(config.pneumonia.preprocess.resize_filter, ResizeFilter::Lanczos3);
        assert_eq!(config.pneumonia.preprocess.input_shape(), [1, 128, 128]);
    }

    #[test]
    fn rejects_mean_count_mismatch() {
        let yaml = YAML.replace("mean: [0.5]", "mean: [0.5, 0.5]");
        let err = ModelsConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { pipeline: "pneumonia", .. }));
    }

    #[test]
    fn rejects_non_positive_std() {
        let mut preprocess = PreprocessConfig::brain_tumor();
        preprocess.std[1] = 0.0;
        assert!(preprocess.validate("brain_tumor").is_err());
    }

    #[test]
    fn rejects_zero_target_size() {
        let mut preprocess = PreprocessConfig::pneumonia();
        preprocess.height = 0;
        assert!(preprocess.validate("pneumonia").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ModelsConfig::load(Path::new("does/not/exist.yaml")).unwrap();
        assert_eq!(config, ModelsConfig::default());
    }
}
