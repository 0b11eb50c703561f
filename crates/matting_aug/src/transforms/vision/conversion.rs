use anyhow::{ensure, Context, Result};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayView3, Axis, Ix2, Ix3};

/// Grayscale image with `f32` samples.
pub type Gray32FImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Scale factor between byte-valued planes and unit-range planes.
pub const BYTE_MAX: f32 = 255.0;

// ============================================================================
// image -> ndarray
// ============================================================================

/// Converts an RGB8 image to an `H×W×3` array keeping the 0..=255 range.
pub fn rgb_to_array(img: &RgbImage) -> Result<Array3<f32>> {
    let (width, height) = img.dimensions();
    let data = img.as_raw().iter().map(|&v| v as f32).collect();
    Array3::from_shape_vec((height as usize, width as usize, 3), data)
        .context("Failed to build HxWx3 array from RGB buffer")
}

/// Converts an 8-bit grayscale image to an `H×W` array keeping the 0..=255 range.
pub fn gray_to_array(img: &GrayImage) -> Result<Array2<f32>> {
    let (width, height) = img.dimensions();
    let data = img.as_raw().iter().map(|&v| v as f32).collect();
    Array2::from_shape_vec((height as usize, width as usize), data)
        .context("Failed to build HxW array from grayscale buffer")
}

// ============================================================================
// ndarray -> image (float planes, used for resampling)
// ============================================================================

pub fn array_to_gray32f(array: ArrayView2<f32>) -> Result<Gray32FImage> {
    let (height, width) = array.dim();
    let data = array.iter().copied().collect();
    ImageBuffer::from_raw(width as u32, height as u32, data)
        .context("Failed to build grayscale float image from array")
}

pub fn gray32f_to_array(img: &Gray32FImage) -> Result<Array2<f32>> {
    let (width, height) = img.dimensions();
    Array2::from_shape_vec((height as usize, width as usize), img.as_raw().clone())
        .context("Failed to build HxW array from grayscale float image")
}

// ============================================================================
// Plane layout helpers
// ============================================================================

/// Views a single-channel plane stored as `H×W` or `H×W×1` as `H×W`.
pub fn as_plane(array: &ArrayD<f32>) -> Result<Array2<f32>> {
    match array.ndim() {
        2 => Ok(array.view().into_dimensionality::<Ix2>()?.to_owned()),
        3 if array.shape()[2] == 1 => Ok(array
            .view()
            .into_dimensionality::<Ix3>()?
            .index_axis(Axis(2), 0)
            .to_owned()),
        _ => anyhow::bail!(
            "Expected a single-channel HxW or HxWx1 array (got shape {:?})",
            array.shape()
        ),
    }
}

/// Views a color image stored as `H×W×3`.
pub fn as_color(array: &ArrayD<f32>) -> Result<ArrayView3<'_, f32>> {
    let view = array
        .view()
        .into_dimensionality::<Ix3>()
        .with_context(|| format!("Expected an HxWx3 array (got shape {:?})", array.shape()))?;
    ensure!(
        view.dim().2 == 3,
        "Expected an HxWx3 array (got shape {:?})",
        array.shape()
    );
    Ok(view)
}

// ============================================================================
// Byte <-> unit scaling
// ============================================================================

/// Maps byte-valued alpha (0..=255) to unit range (0..=1).
pub fn normalize_alpha(alpha: &Array2<f32>) -> Array2<f32> {
    alpha.mapv(|v| v / BYTE_MAX)
}

/// Maps unit-range alpha back to byte values, rounding to the nearest integer.
pub fn denormalize_alpha(alpha: &Array2<f32>) -> Array2<f32> {
    alpha.mapv(|v| (v * BYTE_MAX).round().clamp(0.0, BYTE_MAX))
}
