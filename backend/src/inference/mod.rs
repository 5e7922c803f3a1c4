pub mod config;
pub mod model;
pub mod networks;
pub mod pipeline;
pub mod preprocess;

pub use config::ModelsConfig;
pub use model::{ModelLoadError, select_device};
pub use networks::Architecture;
pub use pipeline::{Pipeline, PipelineError, PredictionResult};
