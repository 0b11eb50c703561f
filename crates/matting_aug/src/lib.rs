pub mod config;
pub mod rng;
pub mod sample;
pub mod transforms;

pub use config::{IntOrRange, PipelineConfig, TransformConfig};
pub use sample::Sample;
pub use transforms::matting::{CompositeFg, GenerateTrimap, MergeFgAndBg};
pub use transforms::{Compose, Transform};
