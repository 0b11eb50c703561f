use crate::sample::{Sample, ALPHA, BG, FG, MERGED};
use crate::transforms::vision::conversion::{as_color, as_plane, BYTE_MAX};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use ndarray::{Array3, Zip};

// ============================================================================
// MergeFgAndBg
// ============================================================================

/// Composites the foreground over the background with the alpha matte.
///
/// Reads `"alpha"` (byte-scaled, `H×W` or `H×W×1`), `"fg"` and `"bg"`
/// (`H×W×3`) and writes
///
/// ```text
/// merged = fg * a + (1 - a) * bg,   a = alpha / 255
/// ```
///
/// under `"merged"`. Inputs are left in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeFgAndBg;

impl MergeFgAndBg {
    pub fn new() -> Self {
        Self
    }
}

impl Transform<Sample, Sample> for MergeFgAndBg {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        let alpha = as_plane(sample.get(ALPHA)?)?;
        let fg = as_color(sample.get(FG)?)?;
        let bg = as_color(sample.get(BG)?)?;

        let (height, width) = alpha.dim();
        ensure!(
            fg.dim() == (height, width, 3) && bg.dim() == (height, width, 3),
            "Shape mismatch: alpha {:?}, fg {:?}, bg {:?}",
            alpha.shape(),
            fg.shape(),
            bg.shape()
        );

        let mut merged = Array3::<f32>::zeros((height, width, 3));
        Zip::indexed(&mut merged)
            .and(&fg)
            .and(&bg)
            .for_each(|(y, x, _), out, &f, &b| {
                let a = alpha[[y, x]] / BYTE_MAX;
                *out = f * a + (1.0 - a) * b;
            });

        sample.insert(MERGED, merged.into_dyn());
        Ok(sample)
    }
}
