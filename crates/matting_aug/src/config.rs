//! src/config.rs
//!
//! Declarative pipeline configuration.
//!
//! A pipeline is an ordered list of transform entries, each tagged by its
//! `"type"`. Entries are validated and instantiated by [`PipelineConfig::build`]
//! into a [`Compose`] that applies them in declared order.
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::from_json(r#"{
//!     "transforms": [
//!         {"type": "CompositeFg", "fg_dir": "data/fg", "alpha_dir": "data/alpha"},
//!         {"type": "MergeFgAndBg"},
//!         {"type": "GenerateTrimap", "kernel_size": [1, 30], "iterations": [1, 5]}
//!     ]
//! }"#)?;
//! let pipeline = config.build()?;
//! let sample = pipeline.apply(sample)?;
//! ```

use crate::sample::Sample;
use crate::transforms::matting::{CompositeFg, GenerateTrimap, MergeFgAndBg};
use crate::transforms::vision::Interpolation;
use crate::transforms::{Compose, Transform};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A single integer `k` (meaning `[k, k + 1)`) or a half-open `[min, max)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrRange {
    Fixed(usize),
    Range([usize; 2]),
}

impl IntOrRange {
    /// Resolves to a non-empty half-open range; `name` labels the error.
    pub fn to_range(self, name: &str) -> Result<Range<usize>> {
        let range = match self {
            IntOrRange::Fixed(k) => {
                let end = k
                    .checked_add(1)
                    .with_context(|| format!("{} value {} is too large", name, k))?;
                k..end
            }
            IntOrRange::Range([min, max]) => min..max,
        };
        ensure!(
            range.start < range.end,
            "{} range must be non-empty (got [{}, {}))",
            name,
            range.start,
            range.end
        );
        Ok(range)
    }
}

impl From<usize> for IntOrRange {
    fn from(k: usize) -> Self {
        IntOrRange::Fixed(k)
    }
}

impl From<[usize; 2]> for IntOrRange {
    fn from(range: [usize; 2]) -> Self {
        IntOrRange::Range(range)
    }
}

fn default_iterations() -> IntOrRange {
    IntOrRange::Fixed(1)
}

fn default_ext() -> String {
    "png".to_string()
}

/// One pipeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformConfig {
    MergeFgAndBg,
    GenerateTrimap {
        kernel_size: IntOrRange,
        #[serde(default = "default_iterations")]
        iterations: IntOrRange,
        #[serde(default)]
        symmetric: bool,
    },
    CompositeFg {
        fg_dir: PathBuf,
        alpha_dir: PathBuf,
        #[serde(default = "default_ext")]
        fg_ext: String,
        #[serde(default = "default_ext")]
        alpha_ext: String,
        #[serde(default)]
        interpolation: Interpolation,
    },
}

impl TransformConfig {
    pub fn name(&self) -> &'static str {
        match self {
            TransformConfig::MergeFgAndBg => "MergeFgAndBg",
            TransformConfig::GenerateTrimap { .. } => "GenerateTrimap",
            TransformConfig::CompositeFg { .. } => "CompositeFg",
        }
    }

    /// Instantiates the configured transform.
    pub fn build(&self) -> Result<Box<dyn Transform<Sample, Sample>>> {
        let step: Box<dyn Transform<Sample, Sample>> = match self {
            TransformConfig::MergeFgAndBg => Box::new(MergeFgAndBg::new()),
            TransformConfig::GenerateTrimap {
                kernel_size,
                iterations,
                symmetric,
            } => Box::new(GenerateTrimap::new(*kernel_size, *iterations, *symmetric)?),
            TransformConfig::CompositeFg {
                fg_dir,
                alpha_dir,
                fg_ext,
                alpha_ext,
                interpolation,
            } => Box::new(
                CompositeFg::builder(fg_dir, alpha_dir)
                    .fg_ext(fg_ext)
                    .alpha_ext(alpha_ext)
                    .interpolation(*interpolation)
                    .build()?,
            ),
        };
        Ok(step)
    }
}

/// Ordered list of transforms making up a sample pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub transforms: Vec<TransformConfig>,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline configuration: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("In {}", path.display()))
    }

    /// Builds every entry in order; the first invalid entry aborts the build.
    pub fn build(&self) -> Result<Compose> {
        self.transforms
            .iter()
            .enumerate()
            .try_fold(Compose::new(), |compose, (idx, entry)| -> Result<Compose> {
                let step = entry
                    .build()
                    .with_context(|| format!("Invalid pipeline entry {} ({})", idx, entry.name()))?;
                log::debug!("Pipeline step {}: {}", idx, entry.name());
                Ok(compose.push_boxed(entry.name(), step))
            })
    }
}
