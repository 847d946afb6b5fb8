//! Rotation-invariant uniform local binary patterns (P = 8, R = 1) and the
//! Shannon entropy of their histogram.
//!
//! Codes: a neighbour sampled on the unit circle (bilinear, zero outside the
//! image) counts as 1 when it is not darker than the centre. Patterns with at
//! most two 0/1 transitions along the sampling order map to their number of
//! ones (0..=8); all others map to 9. The histogram therefore has 10 bins.
use crate::image::{BinaryMask, GrayImageU8};
use std::f64::consts::PI;

pub const LBP_POINTS: usize = 8;
pub const LBP_RADIUS: f64 = 1.0;
/// `P + 2` bins: `0..=P` uniform codes plus one for non-uniform patterns.
pub const LBP_BINS: usize = LBP_POINTS + 2;

const ENTROPY_EPS: f64 = 1e-7;

/// Uniform LBP code for every pixel, row-major.
pub fn uniform_lbp(img: &GrayImageU8) -> Vec<u8> {
    let (w, h) = (img.width(), img.height());
    let offsets = sampling_offsets();
    let mut codes = vec![0u8; w * h];
    let mut bits = [false; LBP_POINTS];
    for y in 0..h {
        for x in 0..w {
            let centre = img.get(x, y) as f64;
            for (bit, &(dr, dc)) in bits.iter_mut().zip(offsets.iter()) {
                let v = sample_bilinear(img, y as f64 + dr, x as f64 + dc);
                *bit = v - centre >= 0.0;
            }
            codes[y * w + x] = uniform_code(&bits);
        }
    }
    codes
}

/// Normalised histogram of `codes` under `mask`; `None` when the mask is empty.
pub fn lbp_histogram(codes: &[u8], mask: &BinaryMask) -> Option<[f64; LBP_BINS]> {
    let mut counts = [0usize; LBP_BINS];
    let mut total = 0usize;
    for idx in mask.on_indices() {
        counts[(codes[idx] as usize).min(LBP_BINS - 1)] += 1;
        total += 1;
    }
    if total == 0 {
        return None;
    }
    let mut hist = [0.0; LBP_BINS];
    for (p, &c) in hist.iter_mut().zip(counts.iter()) {
        *p = c as f64 / total as f64;
    }
    Some(hist)
}

/// `-Σ p·log2(p + 1e-7)` over the histogram.
pub fn shannon_entropy(hist: &[f64]) -> f64 {
    -hist
        .iter()
        .map(|&p| p * (p + ENTROPY_EPS).log2())
        .sum::<f64>()
}

/// Entropy of the LBP histogram restricted to `mask`, `0.0` when empty.
pub fn masked_entropy(codes: &[u8], mask: &BinaryMask) -> f64 {
    lbp_histogram(codes, mask)
        .map(|h| shannon_entropy(&h))
        .unwrap_or(0.0)
}

/// (row, column) offsets of the circular samples, rounded to 5 decimals so
/// axis-aligned samples land exactly on pixel centres.
fn sampling_offsets() -> [(f64, f64); LBP_POINTS] {
    let round5 = |v: f64| (v * 1e5).round() / 1e5;
    std::array::from_fn(|p| {
        let angle = 2.0 * PI * p as f64 / LBP_POINTS as f64;
        (round5(-LBP_RADIUS * angle.sin()), round5(LBP_RADIUS * angle.cos()))
    })
}

fn uniform_code(bits: &[bool; LBP_POINTS]) -> u8 {
    let transitions = bits.windows(2).filter(|w| w[0] != w[1]).count();
    if transitions <= 2 {
        bits.iter().filter(|&&b| b).count() as u8
    } else {
        (LBP_POINTS + 1) as u8
    }
}

fn sample_bilinear(img: &GrayImageU8, r: f64, c: f64) -> f64 {
    let r0 = r.floor();
    let c0 = c.floor();
    let fr = r - r0;
    let fc = c - c0;
    let px = |rr: f64, cc: f64| -> f64 {
        if rr < 0.0 || cc < 0.0 || rr >= img.height() as f64 || cc >= img.width() as f64 {
            0.0
        } else {
            img.get(cc as usize, rr as usize) as f64
        }
    };
    let top = px(r0, c0) + fc * (px(r0, c0 + 1.0) - px(r0, c0));
    let bottom = px(r0 + 1.0, c0) + fc * (px(r0 + 1.0, c0 + 1.0) - px(r0 + 1.0, c0));
    top + fr * (bottom - top)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_interior_is_all_ones_and_peak_is_zero() {
        let mut data = vec![50u8; 7 * 7];
        data[3 * 7 + 3] = 200;
        let img = GrayImageU8::new(7, 7, data);
        let codes = uniform_lbp(&img);
        assert_eq!(codes[3 * 7 + 3], 0);
        assert_eq!(codes[5 * 7 + 5], 8);
    }

    #[test]
    fn border_pixels_see_zero_outside() {
        let img = GrayImageU8::new(5, 5, vec![100; 25]);
        let codes = uniform_lbp(&img);
        // Top-left corner: only the samples pointing right, down and down-right
        // stay inside; that is one contiguous run of ones.
        assert!(codes[0] < 8);
        assert_eq!(codes[2 * 5 + 2], 8);
    }

    #[test]
    fn non_uniform_patterns_share_the_last_bin() {
        let alternating = [true, false, true, false, true, false, true, false];
        assert_eq!(uniform_code(&alternating), 9);
        let run = [false, true, true, true, false, false, false, false];
        assert_eq!(uniform_code(&run), 3);
    }

    #[test]
    fn entropy_of_uniform_histogram_is_log2_of_bins() {
        let hist = [0.1; LBP_BINS];
        assert!((shannon_entropy(&hist) - (LBP_BINS as f64).log2()).abs() < 1e-5);
        let mut peaked = [0.0; LBP_BINS];
        peaked[8] = 1.0;
        assert!(shannon_entropy(&peaked).abs() < 1e-6);
    }

    #[test]
    fn empty_mask_yields_zero_entropy() {
        let codes = vec![3u8; 16];
        assert_eq!(masked_entropy(&codes, &BinaryMask::new(4, 4)), 0.0);
        assert!(lbp_histogram(&codes, &BinaryMask::new(4, 4)).is_none());
    }
}
