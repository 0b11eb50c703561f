pub mod core;
pub mod matting;
pub mod vision;

pub use self::core::{Chain, Compose, Transform};
