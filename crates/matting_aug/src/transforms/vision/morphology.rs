//! Grey-level morphology on single-channel planes.
//!
//! Erosion takes the minimum and dilation the maximum over the neighbourhood
//! selected by a [`StructuringElement`]. Neighbours falling outside the image
//! are ignored, so borders neither grow nor shrink a region on their own.

use anyhow::{ensure, Result};
use ndarray::Array2;
use std::fmt;

/// Binary kernel with an anchor, defining the neighbourhood of a pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: usize,
    height: usize,
    /// `(row, col)` of the kernel cell aligned with the output pixel.
    anchor: (usize, usize),
    mask: Vec<bool>,
}

impl StructuringElement {
    /// Builds an ellipse inscribed in a `size`×`size` box, anchored at its centre.
    ///
    /// Matches the usual `MORPH_ELLIPSE` rasterisation: row `i` spans
    /// `c ± round(c * sqrt(1 - ((i - r) / r)^2))` with `r = c = size / 2`,
    /// clipped to the box.
    pub fn ellipse(size: usize) -> Result<Self> {
        ensure!(size > 0, "Structuring element size must be positive");

        let r = (size / 2) as isize;
        let c = (size / 2) as isize;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut mask = vec![false; size * size];
        for i in 0..size {
            let dy = i as isize - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as isize;
            let j1 = (c - dx).max(0) as usize;
            let j2 = ((c + dx + 1) as usize).min(size);
            mask[i * size + j1..i * size + j2].fill(true);
        }

        Ok(Self {
            width: size,
            height: size,
            anchor: (size / 2, size / 2),
            mask,
        })
    }

    /// Builds a fully set `height`×`width` rectangle anchored at its centre.
    pub fn rectangle(height: usize, width: usize) -> Result<Self> {
        ensure!(
            height > 0 && width > 0,
            "Structuring element dimensions must be positive (got {}x{})",
            height,
            width
        );
        Ok(Self {
            width,
            height,
            anchor: (height / 2, width / 2),
            mask: vec![true; width * height],
        })
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn anchor(&self) -> (usize, usize) {
        self.anchor
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.mask[row * self.width + col]
    }

    /// Offsets `(dy, dx)` of the set cells relative to the anchor.
    fn offsets(&self) -> Vec<(isize, isize)> {
        let (ay, ax) = (self.anchor.0 as isize, self.anchor.1 as isize);
        (0..self.height)
            .flat_map(|i| (0..self.width).map(move |j| (i, j)))
            .filter(|&(i, j)| self.mask[i * self.width + j])
            .map(|(i, j)| (i as isize - ay, j as isize - ax))
            .collect()
    }
}

impl fmt::Display for StructuringElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            if row > 0 {
                writeln!(f)?;
            }
            for col in 0..self.width {
                f.write_str(if self.contains(row, col) { "1" } else { "0" })?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Op {
    Erode,
    Dilate,
}

fn morph_once(src: &Array2<f32>, offsets: &[(isize, isize)], op: Op) -> Array2<f32> {
    let (height, width) = src.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let neighbours = offsets.iter().filter_map(|&(dy, dx)| {
            let sy = y as isize + dy;
            let sx = x as isize + dx;
            if sy < 0 || sx < 0 || sy >= height as isize || sx >= width as isize {
                None
            } else {
                Some(src[[sy as usize, sx as usize]])
            }
        });
        match op {
            Op::Erode => neighbours.fold(f32::INFINITY, f32::min),
            Op::Dilate => neighbours.fold(f32::NEG_INFINITY, f32::max),
        }
    })
}

fn morph(src: &Array2<f32>, element: &StructuringElement, iterations: usize, op: Op) -> Array2<f32> {
    let offsets = element.offsets();
    // A lone anchor cell leaves the image unchanged.
    if iterations == 0 || offsets == [(0, 0)] || src.is_empty() {
        return src.clone();
    }
    (1..iterations).fold(morph_once(src, &offsets, op), |acc, _| {
        morph_once(&acc, &offsets, op)
    })
}

/// Grey-level erosion applied `iterations` times. Zero iterations copies the input.
pub fn erode(src: &Array2<f32>, element: &StructuringElement, iterations: usize) -> Array2<f32> {
    morph(src, element, iterations, Op::Erode)
}

/// Grey-level dilation applied `iterations` times. Zero iterations copies the input.
pub fn dilate(src: &Array2<f32>, element: &StructuringElement, iterations: usize) -> Array2<f32> {
    morph(src, element, iterations, Op::Dilate)
}
