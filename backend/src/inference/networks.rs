//! Network definitions matching the trained checkpoints. Variable paths follow the
//! PyTorch module names so exported state dicts load without renaming.

use tch::nn::{self, ModuleT};
use tch::{Tensor, vision::resnet};

use super::config::{ChannelMode, PreprocessConfig};
use super::model::ModelLoadError;

const RESNET18_FEATURES: i64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// ResNet-18 backbone with a single-logit `fc` head.
    ResNet18Binary,
    /// Three conv/batch-norm/max-pool blocks followed by `fc1` (512) and `fc2` (1).
    ChestCnn,
}

impl Architecture {
    pub fn build(
        self,
        p: &nn::Path,
        preprocess: &PreprocessConfig,
    ) -> Result<Box<dyn ModuleT + Send>, ModelLoadError> {
        match self {
            Architecture::ResNet18Binary => {
                if preprocess.channels != ChannelMode::Rgb {
                    return Err(ModelLoadError::Incompatible(
                        "ResNet-18 expects 3-channel RGB input".into(),
                    ));
                }
                Ok(Box::new(resnet18_binary(p)))
            }
            Architecture::ChestCnn => {
                let [channels, height, width] = preprocess.input_shape();
                if height % 8 != 0 || width % 8 != 0 {
                    return Err(ModelLoadError::Incompatible(format!(
                        "chest CNN input {}x{} must be divisible by 8",
                        width, height
                    )));
                }
                Ok(Box::new(ChestCnn::new(p, channels, height, width)))
            }
        }
    }
}

pub fn resnet18_binary(p: &nn::Path) -> nn::FuncT<'static> {
    let features = resnet::resnet18_no_final_layer(p);
    let fc = nn::linear(p / "fc", RESNET18_FEATURES, 1, Default::default());
    nn::func_t(move |xs, train| xs.apply_t(&features, train).apply(&fc))
}

#[derive(Debug)]
pub struct ChestCnn {
    conv1: nn::Conv2D,
    bn1: nn::BatchNorm,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
    bn3: nn::BatchNorm,
    fc1: nn::Linear,
    fc2: nn::Linear,
}

impl ChestCnn {
    pub fn new(p: &nn::Path, in_channels: i64, height: i64, width: i64) -> Self {
        let conv = nn::ConvConfig {
            padding: 1,
            ..Default::default()
        };
        // Three 2x2 pools.
        let flattened = 128 * (height / 8) * (width / 8);
        Self {
            conv1: nn::conv2d(p / "conv1", in_channels, 32, 3, conv),
            bn1: nn::batch_norm2d(p / "bn1", 32, Default::default()),
            conv2: nn::conv2d(p / "conv2", 32, 64, 3, conv),
            bn2: nn::batch_norm2d(p / "bn2", 64, Default::default()),
            conv3: nn::conv2d(p / "conv3", 64, 128, 3, conv),
            bn3: nn::batch_norm2d(p / "bn3", 128, Default::default()),
            fc1: nn::linear(p / "fc1", flattened, 512, Default::default()),
            fc2: nn::linear(p / "fc2", 512, 1, Default::default()),
        }
    }
}

fn conv_block(xs: &Tensor, conv: &nn::Conv2D, bn: &nn::BatchNorm, train: bool) -> Tensor {
    xs.apply(conv).apply_t(bn, train).relu().max_pool2d_default(2)
}

impl ModuleT for ChestCnn {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let xs = conv_block(xs, &self.conv1, &self.bn1, train);
        let xs = conv_block(&xs, &self.conv2, &self.bn2, train);
        let xs = conv_block(&xs, &self.conv3, &self.bn3, train);
        xs.flat_view()
            .apply(&self.fc1)
            .relu()
            .dropout(0.5, train)
            .apply(&self.fc2)
    }
}
