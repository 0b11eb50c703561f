use anyhow::{anyhow, ensure, Result};
use ndarray::{arr1, ArrayD};
use std::collections::HashMap;

/// Feature name of the alpha matte.
pub const ALPHA: &str = "alpha";
/// Feature name of the foreground image.
pub const FG: &str = "fg";
/// Feature name of the background image.
pub const BG: &str = "bg";
/// Feature name of the composited image written by `MergeFgAndBg`.
pub const MERGED: &str = "merged";
/// Feature name of the trimap written by `GenerateTrimap`.
pub const TRIMAP: &str = "trimap";
/// Feature name of the `[height, width]` working shape.
pub const IMG_SHAPE: &str = "img_shape";

/// The `Sample` struct represents a single training example flowing through
/// a matting pipeline.
///
/// It maps feature names (e.g. `"alpha"`, `"fg"`, `"bg"`) to `f32` arrays of
/// arbitrary rank:
/// - **Keys**(`String`): Feature names
/// - **Values**(`ArrayD<f32>`): Image planes (`H×W` or `H×W×C`) or metadata
///
/// Byte-scaled images keep their 0..=255 range in `f32`. Shape metadata is
/// stored as a 1-D array, e.g. `img_shape = [H, W]`.
///
/// # Examples:
/// - `{"alpha": [H, W], "fg": [H, W, 3], "bg": [H, W, 3], "img_shape": [2]}`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample {
    pub features: HashMap<String, ArrayD<f32>>,
}

impl Sample {
    /// Creates a new `Sample` from a full feature map.
    pub fn new(features: HashMap<String, ArrayD<f32>>) -> Self {
        Self { features }
    }

    /// Creates a `Sample` from a single `(feature_name, array)` pair.
    ///
    /// Chain with [`with_feature`](Self::with_feature) to add more features.
    pub fn from_single(name: impl Into<String>, array: ArrayD<f32>) -> Self {
        Self {
            features: HashMap::from([(name.into(), array)]),
        }
    }

    /// Adds or overwrites a feature in the `Sample`.
    pub fn with_feature(mut self, name: impl Into<String>, array: ArrayD<f32>) -> Self {
        self.features.insert(name.into(), array);
        self
    }

    /// Inserts a feature in place, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, array: ArrayD<f32>) -> Option<ArrayD<f32>> {
        self.features.insert(name.into(), array)
    }

    /// Returns a reference to the array by feature name.
    pub fn get(&self, feature: &str) -> Result<&ArrayD<f32>> {
        self.features
            .get(feature)
            .ok_or_else(|| anyhow!("Feature {} not found", feature))
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    /// Returns an iterator over all feature names in this `Sample`.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Reads `img_shape` as `(height, width)`.
    pub fn img_shape(&self) -> Result<(usize, usize)> {
        let shape = self.get(IMG_SHAPE)?;
        ensure!(
            shape.len() >= 2,
            "img_shape must hold at least [height, width] (got {} values)",
            shape.len()
        );
        let dims: Vec<f32> = shape.iter().copied().collect();
        let (height, width) = (dims[0], dims[1]);
        ensure!(
            height >= 0.0 && width >= 0.0 && height.fract() == 0.0 && width.fract() == 0.0,
            "img_shape must hold non-negative integers (got [{}, {}])",
            height,
            width
        );
        Ok((height as usize, width as usize))
    }

    /// Writes `img_shape` as `[height, width]`.
    pub fn set_img_shape(&mut self, height: usize, width: usize) {
        self.insert(IMG_SHAPE, arr1(&[height as f32, width as f32]).into_dyn());
    }
}
