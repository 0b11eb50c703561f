use crate::transforms::vision::conversion::{array_to_gray32f, gray32f_to_array, rgb_to_array};
use anyhow::{bail, ensure, Context, Result};
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::{Array2, Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Interpolation
// ============================================================================

/// Resampling method used when a loaded image has to match the working size.
///
/// | Name       | Filter                   |
/// |------------|--------------------------|
/// | `nearest`  | Nearest neighbour        |
/// | `bilinear` | Triangle                 |
/// | `bicubic`  | Catmull-Rom              |
/// | `area`     | Pixel-area average       |
/// | `lanczos`  | Lanczos with window 3    |
///
/// `nearest` picks source index `floor(dst * src_len / dst_len)` and `area`
/// averages the source pixels covered by each destination pixel, weighted
/// by overlap. Both are resampled here rather than by `image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
    Bicubic,
    Area,
    Lanczos,
}

impl Interpolation {
    /// Filter used by `imageops::resize`, or `None` for the methods resampled here.
    pub fn filter(self) -> Option<FilterType> {
        match self {
            Interpolation::Bilinear => Some(FilterType::Triangle),
            Interpolation::Bicubic => Some(FilterType::CatmullRom),
            Interpolation::Lanczos => Some(FilterType::Lanczos3),
            Interpolation::Nearest | Interpolation::Area => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Bicubic => "bicubic",
            Interpolation::Area => "area",
            Interpolation::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interpolation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "nearest" => Interpolation::Nearest,
            "bilinear" => Interpolation::Bilinear,
            "bicubic" => Interpolation::Bicubic,
            "area" => Interpolation::Area,
            "lanczos" => Interpolation::Lanczos,
            other => bail!(
                "Unsupported interpolation '{}' (expected nearest, bilinear, bicubic, area or lanczos)",
                other
            ),
        })
    }
}

// ============================================================================
// Index mapping
// ============================================================================

/// Source index of each destination index: `floor(dst * scale)`, clamped.
fn nearest_indices(src_len: usize, dst_len: usize) -> Vec<usize> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| ((d as f64 * scale).floor() as usize).min(src_len - 1))
        .collect()
}

/// `(source index, weight)` pairs per destination index. Weights are the
/// overlap of the source pixel with the destination footprint, normalized.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min((s + 1) as f64) - start.max(s as f64);
                    (overlap > 1e-9).then(|| (s, (overlap / (end - start)) as f32))
                })
                .collect()
        })
        .collect()
}

/// Area-average resample of an `H×W×C` array along both spatial axes.
fn area_resize(src: ArrayView3<f32>, width: usize, height: usize) -> Array3<f32> {
    let (src_h, src_w, channels) = src.dim();
    let rows = area_weights(src_h, height);
    let cols = area_weights(src_w, width);

    let mut tmp = Array3::<f32>::zeros((height, src_w, channels));
    for (y, taps) in rows.iter().enumerate() {
        let mut out = tmp.index_axis_mut(Axis(0), y);
        for &(s, w) in taps {
            out.scaled_add(w, &src.index_axis(Axis(0), s));
        }
    }

    let mut dst = Array3::<f32>::zeros((height, width, channels));
    for (x, taps) in cols.iter().enumerate() {
        let mut out = dst.index_axis_mut(Axis(1), x);
        for &(s, w) in taps {
            out.scaled_add(w, &tmp.index_axis(Axis(1), s));
        }
    }
    dst
}

// ============================================================================
// Resize
// ============================================================================

/// Resizes an RGB8 image to exactly `width`×`height` (aspect ratio is not kept).
pub fn resize_rgb8(
    img: &RgbImage,
    width: u32,
    height: u32,
    interpolation: Interpolation,
) -> Result<RgbImage> {
    ensure!(
        width > 0 && height > 0,
        "Image dimensions must be positive after resizing (got {}x{})",
        width,
        height
    );
    if img.dimensions() == (width, height) {
        return Ok(img.clone());
    }
    let (src_w, src_h) = img.dimensions();
    ensure!(src_w > 0 && src_h > 0, "Cannot resize an empty image");

    match interpolation {
        Interpolation::Nearest => {
            let xs = nearest_indices(src_w as usize, width as usize);
            let ys = nearest_indices(src_h as usize, height as usize);
            Ok(RgbImage::from_fn(width, height, |x, y| {
                *img.get_pixel(xs[x as usize] as u32, ys[y as usize] as u32)
            }))
        }
        Interpolation::Area => {
            let resized = area_resize(rgb_to_array(img)?.view(), width as usize, height as usize);
            let data = resized
                .iter()
                .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                .collect();
            RgbImage::from_raw(width, height, data).context("Failed to build resized RGB image")
        }
        Interpolation::Bilinear | Interpolation::Bicubic | Interpolation::Lanczos => {
            let filter = interpolation
                .filter()
                .context("Interpolation has no image filter")?;
            Ok(imageops::resize(img, width, height, filter))
        }
    }
}

/// Resizes a unit-range plane (`H×W`, values in 0..=1) to `width`×`height`.
///
/// Resampled values are clamped to 0..=1.
pub fn resize_unit_plane(
    plane: &Array2<f32>,
    width: usize,
    height: usize,
    interpolation: Interpolation,
) -> Result<Array2<f32>> {
    ensure!(
        width > 0 && height > 0,
        "Image dimensions must be positive after resizing (got {}x{})",
        width,
        height
    );
    if plane.dim() == (height, width) {
        return Ok(plane.clone());
    }
    ensure!(!plane.is_empty(), "Cannot resize an empty image");

    match interpolation {
        Interpolation::Nearest => {
            let (src_h, src_w) = plane.dim();
            let xs = nearest_indices(src_w, width);
            let ys = nearest_indices(src_h, height);
            Ok(Array2::from_shape_fn((height, width), |(y, x)| plane[[ys[y], xs[x]]]))
        }
        Interpolation::Area => {
            let stacked = plane.view().insert_axis(Axis(2));
            let resized = area_resize(stacked, width, height);
            Ok(resized.index_axis(Axis(2), 0).mapv(|v| v.clamp(0.0, 1.0)))
        }
        Interpolation::Bilinear | Interpolation::Bicubic | Interpolation::Lanczos => {
            let filter = interpolation
                .filter()
                .context("Interpolation has no image filter")?;
            let img = array_to_gray32f(plane.view())?;
            gray32f_to_array(&imageops::resize(&img, width as u32, height as u32, filter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::arr2;

    fn test_gradient_image(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width) as u8;
                let g = (y * 255 / height) as u8;
                img.put_pixel(x, y, Rgb([r, g, 128]));
            }
        }
        img
    }

    #[test]
    fn test_parse_interpolation() -> Result<()> {
        assert_eq!("nearest".parse::<Interpolation>()?, Interpolation::Nearest);
        assert_eq!("Bilinear".parse::<Interpolation>()?, Interpolation::Bilinear);
        assert_eq!(Interpolation::default(), Interpolation::Nearest);
        assert_eq!(Interpolation::Lanczos.to_string(), "lanczos");
        assert_eq!("area".parse::<Interpolation>()?, Interpolation::Area);
        assert!("cubic".parse::<Interpolation>().is_err());
        Ok(())
    }

    #[test]
    fn test_resize_rgb8() -> Result<()> {
        let img = test_gradient_image(100, 60);
        let resized = resize_rgb8(&img, 50, 20, Interpolation::Nearest)?;
        assert_eq!(resized.dimensions(), (50, 20));
        assert!(resize_rgb8(&img, 0, 20, Interpolation::Nearest).is_err());
        Ok(())
    }

    #[test]
    fn test_nearest_upscale_of_plane_repeats_values() -> Result<()> {
        let plane = arr2(&[[0.0f32, 1.0], [1.0, 0.0]]);
        let resized = resize_unit_plane(&plane, 4, 4, Interpolation::Nearest)?;
        assert_eq!(resized.dim(), (4, 4));
        assert!(resized.iter().all(|&v| v == 0.0 || v == 1.0));
        assert_eq!(resized[[0, 0]], 0.0);
        assert_eq!(resized[[0, 3]], 1.0);
        assert_eq!(resized[[3, 0]], 1.0);
        assert_eq!(resized[[3, 3]], 0.0);
        Ok(())
    }

    #[test]
    fn test_same_size_resize_is_identity() -> Result<()> {
        let plane = arr2(&[[0.1f32, 0.2, 0.3], [0.4, 0.5, 0.6]]);
        let resized = resize_unit_plane(&plane, 3, 2, Interpolation::Bicubic)?;
        assert_eq!(resized, plane);
        Ok(())
    }

    #[test]
    fn test_nearest_picks_floor_of_scaled_index() -> Result<()> {
        let plane = arr2(&[[0.0f32, 0.25, 0.5, 0.75, 1.0]]);
        let resized = resize_unit_plane(&plane, 3, 1, Interpolation::Nearest)?;
        assert_eq!(resized, arr2(&[[0.0f32, 0.25, 0.75]]));

        let img = RgbImage::from_fn(5, 1, |x, _| Rgb([x as u8 * 10, 0, 0]));
        let resized = resize_rgb8(&img, 3, 1, Interpolation::Nearest)?;
        let reds: Vec<u8> = resized.pixels().map(|p| p[0]).collect();
        assert_eq!(reds, vec![0, 10, 30]);
        Ok(())
    }

    #[test]
    fn test_area_downscale_averages_blocks() -> Result<()> {
        let plane = arr2(&[
            [0.0f32, 1.0, 0.5, 0.5],
            [1.0, 0.0, 0.5, 0.5],
        ]);
        let resized = resize_unit_plane(&plane, 2, 1, Interpolation::Area)?;
        assert!((resized[[0, 0]] - 0.5).abs() < 1e-6);
        assert!((resized[[0, 1]] - 0.5).abs() < 1e-6);

        // 3 -> 2 splits the middle pixel between both outputs.
        let row = arr2(&[[0.0f32, 0.6, 0.9]]);
        let resized = resize_unit_plane(&row, 2, 1, Interpolation::Area)?;
        assert!((resized[[0, 0]] - 0.2).abs() < 1e-5);
        assert!((resized[[0, 1]] - 0.8).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_area_on_rgb8_keeps_solid_color() -> Result<()> {
        let img = RgbImage::from_pixel(7, 5, Rgb([12, 200, 99]));
        let down = resize_rgb8(&img, 3, 2, Interpolation::Area)?;
        let up = resize_rgb8(&img, 11, 9, Interpolation::Area)?;
        assert_eq!(down.dimensions(), (3, 2));
        assert_eq!(up.dimensions(), (11, 9));
        assert!(down.pixels().chain(up.pixels()).all(|p| *p == Rgb([12, 200, 99])));
        Ok(())
    }
}
