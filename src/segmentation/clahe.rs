//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a `tiles_x × tiles_y` grid (padded with reflect-101
//! borders when the size is not divisible). Each tile gets a clipped-histogram
//! lookup table; every output pixel bilinearly blends the LUTs of the four
//! nearest tile centres.
//!
//! Complexity: O(W·H) for histograms and interpolation plus O(tiles · 256) for
//! the tables.
use crate::image::{GrayImageU8, ImageU8, ImageView};

const HIST_SIZE: usize = 256;

/// Tile-based CLAHE with the given clip limit (relative to a flat histogram).
pub fn clahe(src: &ImageU8<'_>, clip_limit: f32, tiles_x: usize, tiles_y: usize) -> GrayImageU8 {
    let (w, h) = (src.w, src.h);
    if src.is_empty() {
        return GrayImageU8::zeros(w, h);
    }
    let tiles_x = tiles_x.max(1);
    let tiles_y = tiles_y.max(1);
    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);
    let tile_area = tile_w * tile_h;

    let clip = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f32 / HIST_SIZE as f32) as usize).max(1)
    } else {
        usize::MAX
    };
    let lut_scale = (HIST_SIZE - 1) as f32 / tile_area as f32;

    let mut luts = vec![[0u8; HIST_SIZE]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0usize; HIST_SIZE];
            for py in ty * tile_h..(ty + 1) * tile_h {
                let row = src.row(reflect101(py as isize, h));
                for px in tx * tile_w..(tx + 1) * tile_w {
                    hist[row[reflect101(px as isize, w)] as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);
            let lut = &mut luts[ty * tiles_x + tx];
            let mut sum = 0usize;
            for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
                sum += count;
                *entry = (sum as f32 * lut_scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let x_taps: Vec<(usize, usize, f32)> = (0..w)
        .map(|x| interpolation_taps(x, tile_w, tiles_x))
        .collect();
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let (ty1, ty2, ya) = interpolation_taps(y, tile_h, tiles_y);
        let src_row = src.row(y);
        let dst_row = &mut out[y * w..(y + 1) * w];
        for (x, dst) in dst_row.iter_mut().enumerate() {
            let v = src_row[x] as usize;
            let (tx1, tx2, xa) = x_taps[x];
            let top = luts[ty1 * tiles_x + tx1][v] as f32 * (1.0 - xa)
                + luts[ty1 * tiles_x + tx2][v] as f32 * xa;
            let bottom = luts[ty2 * tiles_x + tx1][v] as f32 * (1.0 - xa)
                + luts[ty2 * tiles_x + tx2][v] as f32 * xa;
            let res = top * (1.0 - ya) + bottom * ya;
            *dst = res.round().clamp(0.0, 255.0) as u8;
        }
    }
    GrayImageU8::new(w, h, out)
}

/// Clip every bin at `clip` and spread the excess uniformly, then hand the
/// remainder out one count at a time at a regular stride.
fn clip_histogram(hist: &mut [usize; HIST_SIZE], clip: usize) {
    let mut clipped = 0usize;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }
    if clipped == 0 {
        return;
    }
    let batch = clipped / HIST_SIZE;
    let mut residual = clipped - batch * HIST_SIZE;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Neighbouring tile indices and blend weight for coordinate `p`.
#[inline]
fn interpolation_taps(p: usize, tile: usize, tiles: usize) -> (usize, usize, f32) {
    let f = p as f32 / tile as f32 - 0.5;
    let t1 = f.floor();
    let a = f - t1;
    let t1 = t1 as isize;
    let lo = t1.max(0) as usize;
    let hi = ((t1 + 1).max(0) as usize).min(tiles - 1);
    (lo.min(tiles - 1), hi, a)
}

/// Reflect-101 border index (`dcb|abcd|cba`).
#[inline]
pub(crate) fn reflect101(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let r = i.rem_euclid(period as isize) as usize;
    if r < n {
        r
    } else {
        period - r
    }
}
