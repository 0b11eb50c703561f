#![allow(dead_code)]

use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage};
use matting_aug::sample::{Sample, ALPHA, BG, FG};
use ndarray::{Array2, Array3};
use std::path::Path;

/// Writes `{stem}.png` into both directories: a solid `fg_color` foreground
/// and an alpha matte produced by `alpha_at(x, y)`.
pub fn write_pair(
    fg_dir: &Path,
    alpha_dir: &Path,
    stem: &str,
    size: (u32, u32),
    fg_color: [u8; 3],
    alpha_at: impl Fn(u32, u32) -> u8,
) -> Result<()> {
    let (width, height) = size;
    let fg = RgbImage::from_pixel(width, height, Rgb(fg_color));
    fg.save(fg_dir.join(format!("{}.png", stem)))?;

    let alpha = GrayImage::from_fn(width, height, |x, y| Luma([alpha_at(x, y)]));
    alpha.save(alpha_dir.join(format!("{}.png", stem)))?;
    Ok(())
}

/// Sample with a solid foreground/background and a byte-scaled alpha from
/// `alpha_at(y, x)`; `img_shape` is set to the alpha size.
pub fn make_sample(
    height: usize,
    width: usize,
    fg: f32,
    bg: f32,
    alpha_at: impl Fn(usize, usize) -> f32,
) -> Sample {
    let alpha = Array2::from_shape_fn((height, width), |(y, x)| alpha_at(y, x));
    let mut sample = Sample::from_single(ALPHA, alpha.into_dyn())
        .with_feature(FG, Array3::from_elem((height, width, 3), fg).into_dyn())
        .with_feature(BG, Array3::from_elem((height, width, 3), bg).into_dyn());
    sample.set_img_shape(height, width);
    sample
}
