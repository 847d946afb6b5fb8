//! Gabor filter bank responses over the lung fields.
//!
//! Kernels follow the usual real Gabor definition
//! `exp(-(x'²/σx² + y'²/σy²)/2)·cos(2π·x'/λ + ψ)` with `σx = σ`, `σy = σ/γ`,
//! stored flipped so the filter is applied as a correlation. Responses are
//! saturated to 0–255 (8-bit output) and averaged over lung pixels only, so
//! the cost is proportional to the lung area rather than the image area.
use super::StageError;
use crate::image::{BinaryMask, GrayImageU8, ImageF32, ImageView};
use crate::segmentation::clahe::reflect101;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Filter bank parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaborOptions {
    /// Odd kernel side length.
    pub kernel_size: usize,
    pub sigma: f64,
    pub lambda: f64,
    pub gamma: f64,
    pub psi: f64,
    pub orientations_deg: Vec<f64>,
}

impl Default for GaborOptions {
    fn default() -> Self {
        Self {
            kernel_size: 21,
            sigma: 5.0,
            lambda: 10.0,
            gamma: 0.5,
            psi: 0.0,
            orientations_deg: vec![0.0, 45.0, 90.0, 135.0],
        }
    }
}

impl GaborOptions {
    fn validate(&self) -> Result<(), StageError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(StageError::InvalidParameter {
                stage: "gabor",
                detail: format!("kernel_size must be odd, got {}", self.kernel_size),
            });
        }
        if !(self.sigma > 0.0 && self.lambda > 0.0 && self.gamma > 0.0) {
            return Err(StageError::InvalidParameter {
                stage: "gabor",
                detail: "sigma, lambda and gamma must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Correlation kernel for orientation `theta` (radians).
pub fn gabor_kernel(opts: &GaborOptions, theta: f64) -> DMatrix<f32> {
    let half = (opts.kernel_size / 2) as i64;
    let sigma_x = opts.sigma;
    let sigma_y = opts.sigma / opts.gamma;
    let ex = -0.5 / (sigma_x * sigma_x);
    let ey = -0.5 / (sigma_y * sigma_y);
    let cscale = 2.0 * PI / opts.lambda;
    let (s, c) = theta.sin_cos();
    let n = opts.kernel_size;
    let mut kernel = DMatrix::<f32>::zeros(n, n);
    for y in -half..=half {
        for x in -half..=half {
            let (xf, yf) = (x as f64, y as f64);
            let xr = xf * c + yf * s;
            let yr = -xf * s + yf * c;
            let v = (ex * xr * xr + ey * yr * yr).exp() * (cscale * xr + opts.psi).cos();
            kernel[((half - y) as usize, (half - x) as usize)] = v as f32;
        }
    }
    kernel
}

/// Mean saturated response over lung pixels, one entry per orientation.
///
/// Returns an empty vector when the mask has no on pixels.
pub fn gabor_responses(
    img: &GrayImageU8,
    lung_mask: &BinaryMask,
    opts: &GaborOptions,
) -> Result<Vec<f64>, StageError> {
    opts.validate()?;
    if (img.width(), img.height()) != (lung_mask.width(), lung_mask.height()) {
        return Err(StageError::DimensionMismatch {
            stage: "gabor",
            image: (img.width(), img.height()),
            mask: (lung_mask.width(), lung_mask.height()),
        });
    }
    let pixels: Vec<usize> = lung_mask.on_indices().collect();
    if pixels.is_empty() {
        return Ok(Vec::new());
    }
    let kernels: Vec<DMatrix<f32>> = opts
        .orientations_deg
        .iter()
        .map(|deg| gabor_kernel(opts, deg.to_radians()))
        .collect();

    let src = ImageF32::from_u8(&img.as_view());
    let respond = |kernel: &DMatrix<f32>| -> f64 {
        let sum: u64 = pixels
            .iter()
            .map(|&idx| correlate_at(&src, kernel, idx % src.w, idx / src.w) as u64)
            .sum();
        sum as f64 / pixels.len() as f64
    };

    #[cfg(feature = "parallel")]
    let means: Vec<f64> = kernels.par_iter().map(respond).collect();
    #[cfg(not(feature = "parallel"))]
    let means: Vec<f64> = kernels.iter().map(respond).collect();

    log::debug!("gabor: per-orientation means {:?}", means);
    Ok(means)
}

/// Correlation at `(x, y)` with reflect-101 borders, rounded and saturated to `u8`.
fn correlate_at(src: &ImageF32, kernel: &DMatrix<f32>, x: usize, y: usize) -> u8 {
    let (w, h) = (src.width(), src.height());
    let half = (kernel.nrows() / 2) as isize;
    let mut acc = 0.0f32;
    for ky in 0..kernel.nrows() {
        let row = src.row(reflect101(y as isize + ky as isize - half, h));
        for kx in 0..kernel.ncols() {
            let sx = reflect101(x as isize + kx as isize - half, w);
            acc += kernel[(ky, kx)] * row[sx];
        }
    }
    acc.round().clamp(0.0, 255.0) as u8
}
