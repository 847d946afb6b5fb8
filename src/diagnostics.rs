//! Structured diagnostics returned alongside the main results.
//!
//! Nothing here affects the computed features or the fused confidence; the
//! types exist so tools can show what each stage saw.
pub mod timing;

pub use timing::{StageTiming, Stopwatch, TimingBreakdown};

use crate::segmentation::Region;
use serde::Serialize;

/// Intermediate statistics of one `segment_lungs` call.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationDiagnostics {
    pub width: usize,
    pub height: usize,
    /// Otsu level chosen on the inverted CLAHE image.
    pub otsu_level: u8,
    /// Foreground components after morphology, before filtering.
    pub component_count: usize,
    pub kept_regions: Vec<Region>,
    pub lung_pixels: usize,
    pub lung_area_ratio: f64,
}

impl SegmentationDiagnostics {
    /// True when segmentation produced no lung pixels.
    pub fn is_degraded(&self) -> bool {
        self.lung_pixels == 0
    }
}
