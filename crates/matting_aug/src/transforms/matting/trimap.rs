use crate::config::IntOrRange;
use crate::rng::with_worker_rng;
use crate::sample::{Sample, ALPHA, TRIMAP};
use crate::transforms::vision::conversion::{as_plane, BYTE_MAX};
use crate::transforms::vision::morphology::{dilate, erode, StructuringElement};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use ndarray::{Array2, Zip};
use rand::Rng;
use std::fmt;
use std::ops::Range;

/// Trimap value of definite background.
pub const TRIMAP_BG: f32 = 0.0;
/// Trimap value of the unknown band.
pub const TRIMAP_UNKNOWN: f32 = 128.0;
/// Trimap value of definite foreground.
pub const TRIMAP_FG: f32 = 255.0;

// ============================================================================
// GenerateTrimap
// ============================================================================

/// Synthesises a trimap from the alpha matte with random erosion/dilation.
///
/// Reads `"alpha"` (byte-scaled) and writes `"trimap"` with the same shape,
/// `H×W` or `H×W×1`: pixels that survive erosion at full opacity become 255, pixels
/// still fully transparent after dilation become 0, everything else is 128.
///
/// Kernel sizes and iteration counts are drawn per call from the configured
/// half-open ranges. With `symmetric` the dilation reuses the erosion draw.
///
/// # Example
/// ```ignore
/// let trimap = GenerateTrimap::new(IntOrRange::Range([3, 15]), IntOrRange::Fixed(1), false)?;
/// let sample = trimap.apply(sample)?;
/// ```
#[derive(Debug, Clone)]
pub struct GenerateTrimap {
    kernel_sizes: Range<usize>,
    kernels: Vec<StructuringElement>,
    iterations: Range<usize>,
    symmetric: bool,
}

/// One call's random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorphDraw {
    pub erode_kernel_idx: usize,
    pub erode_iterations: usize,
    pub dilate_kernel_idx: usize,
    pub dilate_iterations: usize,
}

impl GenerateTrimap {
    pub fn new(kernel_size: IntOrRange, iterations: IntOrRange, symmetric: bool) -> Result<Self> {
        let kernel_sizes = kernel_size.to_range("kernel_size")?;
        ensure!(
            kernel_sizes.start > 0,
            "kernel_size must be positive (got range {:?})",
            kernel_sizes
        );
        let iterations = iterations.to_range("iterations")?;

        let kernels = kernel_sizes
            .clone()
            .map(StructuringElement::ellipse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kernel_sizes,
            kernels,
            iterations,
            symmetric,
        })
    }

    pub fn kernels(&self) -> &[StructuringElement] {
        &self.kernels
    }

    /// Draws kernel indices and iteration counts for one call.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> MorphDraw {
        let erode_kernel_idx = rng.random_range(0..self.kernels.len());
        let erode_iterations = rng.random_range(self.iterations.clone());
        let (dilate_kernel_idx, dilate_iterations) = if self.symmetric {
            (erode_kernel_idx, erode_iterations)
        } else {
            (
                rng.random_range(0..self.kernels.len()),
                rng.random_range(self.iterations.clone()),
            )
        };
        MorphDraw {
            erode_kernel_idx,
            erode_iterations,
            dilate_kernel_idx,
            dilate_iterations,
        }
    }

    /// Builds the trimap of `alpha` for a given draw.
    pub fn trimap(&self, alpha: &Array2<f32>, draw: MorphDraw) -> Array2<f32> {
        let eroded = erode(
            alpha,
            &self.kernels[draw.erode_kernel_idx],
            draw.erode_iterations,
        );
        let dilated = dilate(
            alpha,
            &self.kernels[draw.dilate_kernel_idx],
            draw.dilate_iterations,
        );

        let mut trimap = Array2::from_elem(alpha.dim(), TRIMAP_UNKNOWN);
        Zip::from(&mut trimap)
            .and(&eroded)
            .and(&dilated)
            .for_each(|t, &e, &d| {
                if e >= BYTE_MAX {
                    *t = TRIMAP_FG;
                }
                if d <= 0.0 {
                    *t = TRIMAP_BG;
                }
            });
        trimap
    }

    /// Applies the transform drawing from an explicit RNG.
    pub fn apply_with_rng<R: Rng + ?Sized>(&self, mut sample: Sample, rng: &mut R) -> Result<Sample> {
        let raw_alpha = sample.get(ALPHA)?;
        let alpha_dim = raw_alpha.raw_dim();
        let alpha = as_plane(raw_alpha)?;
        let draw = self.draw(rng);
        log::debug!(
            "GenerateTrimap: erode k={} x{}, dilate k={} x{}",
            self.kernel_sizes.start + draw.erode_kernel_idx,
            draw.erode_iterations,
            self.kernel_sizes.start + draw.dilate_kernel_idx,
            draw.dilate_iterations
        );

        let trimap = self
            .trimap(&alpha, draw)
            .into_dyn()
            .into_shape_with_order(alpha_dim)?;
        sample.insert(TRIMAP, trimap);
        Ok(sample)
    }
}

impl Transform<Sample, Sample> for GenerateTrimap {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        with_worker_rng(|rng| self.apply_with_rng(sample, rng))
    }
}

impl fmt::Display for GenerateTrimap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GenerateTrimap(kernel_sizes={:?}, min_iteration={}, max_iteration={}, symmetric={})",
            self.kernel_sizes.clone().collect::<Vec<_>>(),
            self.iterations.start,
            self.iterations.end,
            if self.symmetric { "True" } else { "False" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::init_worker_rng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 255 disc of radius 14 in a 40x40 frame, with a soft ring around it.
    fn soft_disc() -> Array2<f32> {
        Array2::from_shape_fn((40, 40), |(y, x)| {
            let d = ((y as f32 - 20.0).powi(2) + (x as f32 - 20.0).powi(2)).sqrt();
            if d <= 14.0 {
                255.0
            } else if d <= 16.0 {
                100.0
            } else {
                0.0
            }
        })
    }

    fn alpha_sample(alpha: Array2<f32>) -> Sample {
        Sample::from_single(ALPHA, alpha.into_dyn())
    }

    #[test]
    fn test_fixed_kernel_builds_one_ellipse() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Fixed(5), IntOrRange::Fixed(1), false)?;
        assert_eq!(gen.kernels().len(), 1);
        assert_eq!(gen.kernels()[0].dims(), (5, 5));

        let gen = GenerateTrimap::new(IntOrRange::Range([3, 7]), IntOrRange::Fixed(1), false)?;
        let sizes: Vec<_> = gen.kernels().iter().map(|k| k.dims().0).collect();
        assert_eq!(sizes, vec![3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(GenerateTrimap::new(IntOrRange::Fixed(0), IntOrRange::Fixed(1), false).is_err());
        assert!(GenerateTrimap::new(IntOrRange::Range([5, 5]), IntOrRange::Fixed(1), false).is_err());
        assert!(GenerateTrimap::new(IntOrRange::Fixed(3), IntOrRange::Range([4, 2]), true).is_err());
    }

    #[test]
    fn test_trimap_values_and_regions() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Range([3, 8]), IntOrRange::Range([1, 3]), false)?;
        let alpha = soft_disc();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10 {
            let out = gen.apply_with_rng(alpha_sample(alpha.clone()), &mut rng)?;
            let trimap = out.get(TRIMAP)?;
            assert_eq!(trimap.shape(), alpha.shape());

            for (&t, &a) in trimap.iter().zip(alpha.iter()) {
                assert!(t == TRIMAP_BG || t == TRIMAP_UNKNOWN || t == TRIMAP_FG);
                // Foreground only where alpha was opaque, background only where it was clear.
                if t == TRIMAP_FG {
                    assert_eq!(a, 255.0);
                }
                if t == TRIMAP_BG {
                    assert_eq!(a, 0.0);
                }
                // Soft pixels always land in the unknown band.
                if a > 0.0 && a < 255.0 {
                    assert_eq!(t, TRIMAP_UNKNOWN);
                }
            }
            // Centre and corner are far from the boundary for every kernel drawn.
            assert_eq!(trimap[[20, 20]], TRIMAP_FG);
            assert_eq!(trimap[[0, 0]], TRIMAP_BG);
        }
        Ok(())
    }

    #[test]
    fn test_symmetric_draw_reuses_erosion() {
        let gen = GenerateTrimap::new(IntOrRange::Range([3, 20]), IntOrRange::Range([1, 10]), true)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let draw = gen.draw(&mut rng);
            assert_eq!(draw.erode_kernel_idx, draw.dilate_kernel_idx);
            assert_eq!(draw.erode_iterations, draw.dilate_iterations);
            assert!(draw.erode_kernel_idx < 17);
            assert!((1..10).contains(&draw.erode_iterations));
        }
    }

    #[test]
    fn test_fixed_symmetric_is_deterministic() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Fixed(5), IntOrRange::Fixed(2), true)?;
        let first = gen.apply_with_rng(alpha_sample(soft_disc()), &mut StdRng::seed_from_u64(1))?;
        let second = gen.apply_with_rng(alpha_sample(soft_disc()), &mut StdRng::seed_from_u64(99))?;
        assert_eq!(first.get(TRIMAP)?, second.get(TRIMAP)?);
        Ok(())
    }

    #[test]
    fn test_worker_rng_drives_apply() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Range([3, 12]), IntOrRange::Range([1, 3]), false)?;

        init_worker_rng(0, 0, 42);
        let first = gen.apply(alpha_sample(soft_disc()))?;
        init_worker_rng(0, 0, 42);
        let second = gen.apply(alpha_sample(soft_disc()))?;
        assert_eq!(first.get(TRIMAP)?, second.get(TRIMAP)?);
        Ok(())
    }

    #[test]
    fn test_stacked_alpha_gives_stacked_trimap() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Fixed(3), IntOrRange::Fixed(1), true)?;
        let alpha = soft_disc().into_shape_with_order((40, 40, 1))?;
        let out = gen.apply_with_rng(
            Sample::from_single(ALPHA, alpha.into_dyn()),
            &mut StdRng::seed_from_u64(0),
        )?;
        let trimap = out.get(TRIMAP)?;
        assert_eq!(trimap.shape(), &[40, 40, 1]);
        assert_eq!(out.get(ALPHA)?.shape(), &[40, 40, 1]);
        assert_eq!(trimap[[20, 20, 0]], TRIMAP_FG);
        assert_eq!(trimap[[0, 0, 0]], TRIMAP_BG);
        Ok(())
    }

    #[test]
    fn test_missing_alpha_is_an_error() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Fixed(3), IntOrRange::Fixed(1), false)?;
        let sample = Sample::from_single("fg", Array2::<f32>::zeros((4, 4)).into_dyn());

        let err = gen
            .apply_with_rng(sample, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(err.to_string().contains("Feature alpha not found"));
        Ok(())
    }

    #[test]
    fn test_display_lists_configuration() -> Result<()> {
        let gen = GenerateTrimap::new(IntOrRange::Range([3, 5]), IntOrRange::Fixed(1), true)?;
        assert_eq!(
            gen.to_string(),
            "GenerateTrimap(kernel_sizes=[3, 4], min_iteration=1, max_iteration=2, symmetric=True)"
        );
        Ok(())
    }
}
