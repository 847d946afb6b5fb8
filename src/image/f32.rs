//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! The Gabor stage widens the 8-bit input once and correlates on this copy.
//! Values keep the 0–255 intensity scale.
use super::{ImageU8, ImageView};

#[derive(Clone, Debug)]
pub struct ImageF32 {
    pub w: usize,
    pub h: usize,
    /// Elements between consecutive rows (equals `w`).
    pub stride: usize,
    pub data: Vec<f32>,
}

impl ImageF32 {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Widen an 8-bit view without rescaling.
    pub fn from_u8(gray: &ImageU8<'_>) -> Self {
        let mut out = Self::new(gray.w, gray.h);
        for y in 0..gray.h {
            let start = y * out.stride;
            for (dst, &v) in out.data[start..start + gray.w].iter_mut().zip(gray.row(y)) {
                *dst = v as f32;
            }
        }
        out
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.stride + x]
    }
}

impl ImageView for ImageF32 {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_respects_stride() {
        // 2×2 visible pixels inside a stride-3 buffer
        let data = [1u8, 2, 99, 3, 4, 99];
        let view = ImageU8 {
            w: 2,
            h: 2,
            stride: 3,
            data: &data,
        };
        let img = ImageF32::from_u8(&view);
        assert_eq!(img.data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(img.row(1), &[3.0, 4.0]);
    }
}
