//! Owned binary mask with values in `{0, 255}`.
//!
//! Every mask produced by the segmentation and feature stages uses this type so
//! the 0/255 invariant is enforced in one place.
use image::GrayImage;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    w: usize,
    h: usize,
    data: Vec<u8>,
}

impl BinaryMask {
    /// All-off mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![MASK_OFF; w * h],
        }
    }

    /// All-on mask of size `w × h`.
    pub fn filled(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![MASK_ON; w * h],
        }
    }

    /// Build from raw bytes; any non-zero byte is treated as on.
    ///
    /// Returns `None` when `data.len() != w * h`.
    pub fn from_raw(w: usize, h: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != w * h {
            return None;
        }
        let data = data
            .into_iter()
            .map(|v| if v != 0 { MASK_ON } else { MASK_OFF })
            .collect();
        Some(Self { w, h, data })
    }

    /// Build from a predicate evaluated at every pixel.
    pub fn from_fn(w: usize, h: usize, mut on: impl FnMut(usize, usize) -> bool) -> Self {
        let mut mask = Self::new(w, h);
        for y in 0..h {
            for x in 0..w {
                if on(x, y) {
                    mask.data[y * w + x] = MASK_ON;
                }
            }
        }
        mask
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_on(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x] != MASK_OFF
    }

    #[inline]
    pub fn is_on_index(&self, idx: usize) -> bool {
        self.data[idx] != MASK_OFF
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.data[y * self.w + x] = if on { MASK_ON } else { MASK_OFF };
    }

    /// Number of on pixels.
    pub fn count_on(&self) -> usize {
        self.data.iter().filter(|&&v| v != MASK_OFF).count()
    }

    /// Linear indices of on pixels in row-major order.
    pub fn on_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| (v != MASK_OFF).then_some(i))
    }

    /// Pixel-wise AND. Panics if the dimensions differ.
    pub fn intersect(&self, other: &BinaryMask) -> BinaryMask {
        assert_eq!(
            (self.w, self.h),
            (other.w, other.h),
            "mask dimensions must match"
        );
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| if a != MASK_OFF && b != MASK_OFF { MASK_ON } else { MASK_OFF })
            .collect();
        BinaryMask {
            w: self.w,
            h: self.h,
            data,
        }
    }

    /// Raw 0/255 bytes in row-major order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy into an `image::GrayImage` for the `imageproc` routines.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.w as u32, self.h as u32, self.data.clone())
            .unwrap_or_else(|| GrayImage::new(self.w as u32, self.h as u32))
    }
}
