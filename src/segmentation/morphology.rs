//! Binary morphology with rectangular structuring elements.
//!
//! A `k × k` rectangle is separable, so erosion/dilation run as a horizontal
//! pass followed by a vertical pass. Each pass uses a running count of on
//! pixels inside the window, which makes the cost independent of `k`.
//!
//! Conventions: the anchor of a `k`-wide element sits at `k / 2` (even sizes
//! extend one pixel further before the anchor than after it), and samples
//! outside the image are ignored, so borders neither erode nor dilate the mask.
use crate::image::{mask::MASK_OFF, mask::MASK_ON, BinaryMask};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MorphOp {
    Erode,
    Dilate,
}

/// Erode with a `k × k` rectangle, `iterations` times.
pub fn erode(mask: &BinaryMask, k: usize, iterations: usize) -> BinaryMask {
    repeat(mask, k, iterations, MorphOp::Erode)
}

/// Dilate with a `k × k` rectangle, `iterations` times.
pub fn dilate(mask: &BinaryMask, k: usize, iterations: usize) -> BinaryMask {
    repeat(mask, k, iterations, MorphOp::Dilate)
}

/// Opening: `iterations` erosions followed by `iterations` dilations.
pub fn open(mask: &BinaryMask, k: usize, iterations: usize) -> BinaryMask {
    dilate(&erode(mask, k, iterations), k, iterations)
}

/// Closing: `iterations` dilations followed by `iterations` erosions.
pub fn close(mask: &BinaryMask, k: usize, iterations: usize) -> BinaryMask {
    erode(&dilate(mask, k, iterations), k, iterations)
}

fn repeat(mask: &BinaryMask, k: usize, iterations: usize, op: MorphOp) -> BinaryMask {
    let mut current = mask.clone();
    if k <= 1 {
        return current;
    }
    for _ in 0..iterations {
        current = apply_once(&current, k, op);
    }
    current
}

fn apply_once(mask: &BinaryMask, k: usize, op: MorphOp) -> BinaryMask {
    let (w, h) = (mask.width(), mask.height());
    if w == 0 || h == 0 {
        return mask.clone();
    }
    let before = k / 2;
    let after = k - 1 - before;
    let src = mask.as_bytes();
    let mut tmp = vec![MASK_OFF; w * h];
    let mut counts = Vec::with_capacity(w.max(h) + 1);

    for y in 0..h {
        filter_line(src, &mut tmp, y * w, 1, w, before, after, op, &mut counts);
    }
    let mut out = vec![MASK_OFF; w * h];
    for x in 0..w {
        filter_line(&tmp, &mut out, x, w, h, before, after, op, &mut counts);
    }
    BinaryMask::from_raw(w, h, out).unwrap_or_else(|| BinaryMask::new(w, h))
}

/// Process one line of `len` samples starting at `start` with element step `step`.
#[allow(clippy::too_many_arguments)]
fn filter_line(
    src: &[u8],
    dst: &mut [u8],
    start: usize,
    step: usize,
    len: usize,
    before: usize,
    after: usize,
    op: MorphOp,
    prefix: &mut Vec<u32>,
) {
    prefix.clear();
    prefix.push(0);
    let mut acc = 0u32;
    for i in 0..len {
        if src[start + i * step] != MASK_OFF {
            acc += 1;
        }
        prefix.push(acc);
    }
    for i in 0..len {
        let lo = i.saturating_sub(before);
        let hi = (i + after).min(len - 1);
        let on = prefix[hi + 1] - prefix[lo];
        let span = (hi + 1 - lo) as u32;
        let keep = match op {
            MorphOp::Dilate => on > 0,
            MorphOp::Erode => on == span,
        };
        dst[start + i * step] = if keep { MASK_ON } else { MASK_OFF };
    }
}
