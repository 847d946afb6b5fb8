//! Classical lung-field segmentation for frontal chest radiographs.
//!
//! Pipeline (no learned model):
//! - `preprocess`: resize to the working resolution and min-max stretch.
//! - `segment_lungs`: CLAHE → invert → Otsu threshold → opening → closing →
//!   keep the largest regions → fill holes.
//! - `get_zonal_masks`: split the lung mask into six anatomical zones.
//!
//! Lungs are dark on a radiograph, so after inversion they are the bright
//! foreground that Otsu separates from mediastinum, bone and soft tissue.
pub mod clahe;
pub mod components;
pub mod morphology;
pub mod zones;

use crate::diagnostics::SegmentationDiagnostics;
use crate::image::{BinaryMask, GrayImageU8};
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

pub use components::{ComponentSelection, Region};
pub use zones::{ZoneLayout, ZoneMasks};

/// Knobs for [`LungSegmenter`]. Defaults match the calibrated pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterOptions {
    /// Working resolution (square) used by `preprocess`.
    pub target_size: usize,
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis.
    pub clahe_grid: usize,
    pub open_kernel: usize,
    pub open_iterations: usize,
    pub close_kernel: usize,
    pub close_iterations: usize,
    /// Maximum number of connected regions kept (two lungs).
    pub max_regions: usize,
    /// Regions must cover strictly more than this fraction of the image.
    pub min_area_fraction: f64,
}

impl Default for SegmenterOptions {
    fn default() -> Self {
        Self {
            target_size: 512,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            open_kernel: 5,
            open_iterations: 2,
            close_kernel: 20,
            close_iterations: 2,
            max_regions: 2,
            min_area_fraction: 0.05,
        }
    }
}

/// Stateless lung segmenter; holds only its options.
#[derive(Clone, Debug, Default)]
pub struct LungSegmenter {
    options: SegmenterOptions,
}

impl LungSegmenter {
    pub fn new(options: SegmenterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SegmenterOptions {
        &self.options
    }

    /// Resize to `target_size²` (bilinear) and stretch intensities to 0–255.
    ///
    /// Empty input yields a zero image of the working size.
    pub fn preprocess(&self, image: &GrayImageU8) -> GrayImageU8 {
        let size = self.options.target_size.max(1);
        if image.width() == 0 || image.height() == 0 || image.data().is_empty() {
            log::warn!("preprocess: empty input, returning blank {size}x{size} image");
            return GrayImageU8::zeros(size, size);
        }
        let resized = if image.width() == size && image.height() == size {
            image.clone()
        } else {
            let gray = image.to_gray_image();
            GrayImageU8::from(imageops::resize(
                &gray,
                size as u32,
                size as u32,
                FilterType::Triangle,
            ))
        };
        min_max_stretch(&resized)
    }

    /// Binary lung mask (0/255) with the same dimensions as `image`.
    pub fn segment_lungs(&self, image: &GrayImageU8) -> BinaryMask {
        self.segment_lungs_detailed(image).0
    }

    /// Like [`segment_lungs`](Self::segment_lungs) but also reports intermediate statistics.
    pub fn segment_lungs_detailed(
        &self,
        image: &GrayImageU8,
    ) -> (BinaryMask, SegmentationDiagnostics) {
        let (w, h) = (image.width(), image.height());
        let mut diag = SegmentationDiagnostics {
            width: w,
            height: h,
            ..Default::default()
        };
        if w == 0 || h == 0 || image.data().len() != w * h {
            log::warn!("segment_lungs: empty or malformed input {w}x{h}");
            return (BinaryMask::new(w, h), diag);
        }
        let opts = &self.options;

        let enhanced = clahe::clahe(
            &image.as_view(),
            opts.clahe_clip_limit,
            opts.clahe_grid,
            opts.clahe_grid,
        );
        let (lo, hi) = enhanced
            .data()
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo == hi {
            // Otsu has nothing to separate on a uniform image.
            log::warn!("segment_lungs: uniform image, no lung field");
            return (BinaryMask::new(w, h), diag);
        }
        let mut inverted = enhanced.to_gray_image();
        imageops::invert(&mut inverted);
        let level = imageproc::contrast::otsu_level(&inverted);
        diag.otsu_level = level;
        let binary = BinaryMask::from_fn(w, h, |x, y| inverted.get_pixel(x as u32, y as u32)[0] > level);
        log::debug!(
            "segment_lungs: otsu level {level}, {} foreground px",
            binary.count_on()
        );

        let opened = morphology::open(&binary, opts.open_kernel, opts.open_iterations);
        let closed = morphology::close(&opened, opts.close_kernel, opts.close_iterations);
        let selection =
            components::keep_largest_regions(&closed, opts.max_regions, opts.min_area_fraction);

        diag.component_count = selection.component_count;
        diag.kept_regions = selection.kept.clone();
        diag.lung_pixels = selection.mask.count_on();
        diag.lung_area_ratio = calculate_lung_area_ratio(&selection.mask);
        if diag.lung_pixels == 0 {
            log::warn!("segment_lungs: no lung region survived filtering");
        }
        (selection.mask, diag)
    }

    pub fn get_zonal_masks(&self, mask: &BinaryMask) -> ZoneMasks {
        get_zonal_masks(mask)
    }

    pub fn calculate_lung_area_ratio(&self, mask: &BinaryMask) -> f64 {
        calculate_lung_area_ratio(mask)
    }
}

/// Six disjoint zone masks whose union is `mask`.
pub fn get_zonal_masks(mask: &BinaryMask) -> ZoneMasks {
    ZoneMasks::from_mask(mask)
}

/// Fraction of on pixels; `0.0` for an empty mask.
pub fn calculate_lung_area_ratio(mask: &BinaryMask) -> f64 {
    if mask.is_empty() {
        return 0.0;
    }
    mask.count_on() as f64 / mask.len() as f64
}

/// Linear stretch so the darkest pixel maps to 0 and the brightest to 255.
fn min_max_stretch(image: &GrayImageU8) -> GrayImageU8 {
    let data = image.data();
    let (lo, hi) = data
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if data.is_empty() || hi <= lo {
        return GrayImageU8::zeros(image.width(), image.height());
    }
    let scale = 255.0 / (hi - lo) as f32;
    let out = data
        .iter()
        .map(|&v| ((v - lo) as f32 * scale).round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImageU8::new(image.width(), image.height(), out)
}
