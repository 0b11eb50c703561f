use crate::rng::with_worker_rng;
use crate::sample::{Sample, ALPHA, FG};
use crate::transforms::vision::conversion::{
    as_color, as_plane, denormalize_alpha, normalize_alpha, rgb_to_array,
};
use crate::transforms::vision::geometric::{resize_rgb8, resize_unit_plane, Interpolation};
use crate::transforms::vision::io::LoadImage;
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Context, Result};
use ndarray::{Array2, Array3, ArrayView3, Zip};
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Probability that a call composites with a second foreground.
const COMPOSITE_PROB: f64 = 0.5;

// ============================================================================
// CompositeFg
// ============================================================================

/// Composites the current foreground with a random foreground from disk.
///
/// With probability 0.5 a second `(fg2, alpha2)` pair is loaded from
/// `fg_dir`/`alpha_dir`, resized to `img_shape`, and combined as
///
/// ```text
/// fg_new    = alpha * fg + (1 - alpha) * fg2
/// alpha_new = 1 - (1 - alpha) * (1 - alpha2)
/// ```
///
/// where alphas are in 0..=1. `alpha_new` stays within 0..=1, so two 50%
/// transparent mattes overlap to 75%. If `alpha_new` is fully opaque the
/// second sample is discarded.
///
/// Reads `"fg"`, `"alpha"` (byte-scaled) and `"img_shape"`. When a
/// composite is applied it overwrites `"fg"`, `"alpha"` (byte-scaled) and
/// `"img_shape"`; otherwise the sample is returned untouched.
///
/// The pool of candidate stems is scanned from `fg_dir` once, at
/// construction. Matching alpha files are not checked until they are loaded.
#[derive(Debug, Clone)]
pub struct CompositeFg {
    fg_dir: PathBuf,
    alpha_dir: PathBuf,
    fg_ext: String,
    alpha_ext: String,
    interpolation: Interpolation,
    stems: Vec<String>,
    loader: LoadImage,
}

/// Builder for [`CompositeFg`] with method chaining
#[derive(Debug, Clone)]
pub struct CompositeFgBuilder {
    fg_dir: PathBuf,
    alpha_dir: PathBuf,
    fg_ext: String,
    alpha_ext: String,
    interpolation: Interpolation,
}

impl CompositeFgBuilder {
    /// Set the foreground file extension, without the dot (default `png`)
    pub fn fg_ext(mut self, ext: impl Into<String>) -> Self {
        self.fg_ext = ext.into();
        self
    }

    /// Set the alpha file extension, without the dot (default `png`)
    pub fn alpha_ext(mut self, ext: impl Into<String>) -> Self {
        self.alpha_ext = ext.into();
        self
    }

    /// Set the resampling method for loaded pairs (default nearest)
    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Scan `fg_dir` and build the transform.
    pub fn build(self) -> Result<CompositeFg> {
        let fg_ext = self.fg_ext.trim_start_matches('.').to_string();
        let alpha_ext = self.alpha_ext.trim_start_matches('.').to_string();
        ensure!(!fg_ext.is_empty(), "fg_ext must not be empty");
        ensure!(!alpha_ext.is_empty(), "alpha_ext must not be empty");

        let stems = scan_stems(&self.fg_dir, &fg_ext)?;
        ensure!(
            !stems.is_empty(),
            "No '.{}' foregrounds found in {}",
            fg_ext,
            self.fg_dir.display()
        );
        log::info!(
            "CompositeFg: {} candidate foregrounds in {}",
            stems.len(),
            self.fg_dir.display()
        );

        Ok(CompositeFg {
            fg_dir: self.fg_dir,
            alpha_dir: self.alpha_dir,
            fg_ext,
            alpha_ext,
            interpolation: self.interpolation,
            stems,
            loader: LoadImage::new(),
        })
    }
}

/// Lists file stems in `dir` (non-recursive) whose names end in `.{ext}`, sorted.
fn scan_stems(dir: &Path, ext: &str) -> Result<Vec<String>> {
    let suffix = format!(".{}", ext);
    let mut stems = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to scan directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(&suffix) {
            if !stem.is_empty() {
                stems.push(stem.to_string());
            }
        }
    }
    Ok(stems)
}

/// Screen composition of two unit-range mattes: `1 - (1 - a) * (1 - b)`.
///
/// The result is clamped to `[max(a, b), 1]` so float rounding never drops
/// it below either input.
pub fn screen_alpha(a: &Array2<f32>, b: &Array2<f32>) -> Result<Array2<f32>> {
    ensure!(
        a.dim() == b.dim(),
        "Shape mismatch: alpha {:?} vs alpha2 {:?}",
        a.shape(),
        b.shape()
    );
    Ok(Zip::from(a)
        .and(b)
        .map_collect(|&a, &b| (1.0 - (1.0 - a) * (1.0 - b)).max(a).max(b).min(1.0)))
}

/// `alpha * fg + (1 - alpha) * fg2`, per pixel across channels.
fn blend_fg(fg: ArrayView3<f32>, fg2: ArrayView3<f32>, alpha: &Array2<f32>) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros(fg.dim());
    Zip::indexed(&mut out)
        .and(&fg)
        .and(&fg2)
        .for_each(|(y, x, _), o, &f1, &f2| {
            let a = alpha[[y, x]];
            *o = f1 * a + f2 * (1.0 - a);
        });
    out
}

impl CompositeFg {
    /// Builds the transform with default extensions and interpolation.
    pub fn new(fg_dir: impl Into<PathBuf>, alpha_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(fg_dir, alpha_dir).build()
    }

    pub fn builder(fg_dir: impl Into<PathBuf>, alpha_dir: impl Into<PathBuf>) -> CompositeFgBuilder {
        CompositeFgBuilder {
            fg_dir: fg_dir.into(),
            alpha_dir: alpha_dir.into(),
            fg_ext: "png".to_string(),
            alpha_ext: "png".to_string(),
            interpolation: Interpolation::default(),
        }
    }

    /// Candidate stems, sorted.
    pub fn stems(&self) -> &[String] {
        &self.stems
    }

    fn fg_path(&self, stem: &str) -> PathBuf {
        self.fg_dir.join(format!("{}.{}", stem, self.fg_ext))
    }

    fn alpha_path(&self, stem: &str) -> PathBuf {
        self.alpha_dir.join(format!("{}.{}", stem, self.alpha_ext))
    }

    /// Loads `(fg2, alpha2)` for `stem`, resized to `width`×`height`.
    /// `fg2` stays byte-scaled, `alpha2` is normalized to 0..=1.
    pub fn load_pair(&self, stem: &str, width: usize, height: usize) -> Result<(Array3<f32>, Array2<f32>)> {
        let fg2 = self.loader.load_rgb8(&self.fg_path(stem))?;
        let fg2 = resize_rgb8(&fg2, width as u32, height as u32, self.interpolation)?;
        let fg2 = rgb_to_array(&fg2)?;

        let alpha2 = normalize_alpha(&self.loader.load_grayscale(&self.alpha_path(stem))?);
        let alpha2 = resize_unit_plane(&alpha2, width, height, self.interpolation)?;

        ensure!(
            fg2.dim() == (height, width, 3) && alpha2.dim() == (height, width),
            "Resized pair '{}' has shape fg {:?}, alpha {:?} (expected {}x{})",
            stem,
            fg2.shape(),
            alpha2.shape(),
            height,
            width
        );
        Ok((fg2, alpha2))
    }

    /// Applies the transform drawing from an explicit RNG.
    pub fn apply_with_rng<R: Rng + ?Sized>(&self, mut sample: Sample, rng: &mut R) -> Result<Sample> {
        let raw_alpha = sample.get(ALPHA)?;
        let alpha_dim = raw_alpha.raw_dim();
        let alpha = normalize_alpha(&as_plane(raw_alpha)?);
        ensure!(sample.contains(FG), "Feature {} not found", FG);
        let (height, width) = sample.img_shape()?;

        if !rng.random_bool(COMPOSITE_PROB) {
            log::debug!("CompositeFg: skipped");
            return Ok(sample);
        }

        let stem = self
            .stems
            .get(rng.random_range(0..self.stems.len()))
            .ok_or_else(|| anyhow!("CompositeFg has no candidate foregrounds"))?;
        let (fg2, alpha2) = self
            .load_pair(stem, width, height)
            .with_context(|| format!("CompositeFg failed to load '{}'", stem))?;

        let fg = as_color(sample.get(FG)?)?;
        ensure!(
            alpha.dim() == (height, width) && fg.dim() == (height, width, 3),
            "Shape mismatch: img_shape [{}, {}], alpha {:?}, fg {:?}",
            height,
            width,
            alpha.shape(),
            fg.shape()
        );

        let combined = screen_alpha(&alpha, &alpha2)?;
        // A fully opaque result would leave no unknown region for the trimap.
        if combined.iter().all(|&a| a >= 1.0) {
            log::debug!("CompositeFg: '{}' gives an all-opaque alpha, discarded", stem);
            return Ok(sample);
        }
        log::debug!("CompositeFg: composited with '{}'", stem);

        let blended = blend_fg(fg, fg2.view(), &alpha);
        let (new_height, new_width) = combined.dim();
        // Same layout as the incoming alpha (H×W or H×W×1).
        let new_alpha = denormalize_alpha(&combined)
            .into_dyn()
            .into_shape_with_order(alpha_dim)?;
        sample.insert(FG, blended.into_dyn());
        sample.insert(ALPHA, new_alpha);
        sample.set_img_shape(new_height, new_width);
        Ok(sample)
    }
}

impl Transform<Sample, Sample> for CompositeFg {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        with_worker_rng(|rng| self.apply_with_rng(sample, rng))
    }
}

impl fmt::Display for CompositeFg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompositeFg(fg_dir='{}', alpha_dir='{}', fg_ext='{}', alpha_ext='{}', interpolation='{}')",
            self.fg_dir.display(),
            self.alpha_dir.display(),
            self.fg_ext,
            self.alpha_ext,
            self.interpolation
        )
    }
}
