//! Shape of bright opacities inside the lung fields.
//!
//! Pixels brighter than `mean + 1.5·std` of the lung intensities are kept,
//! restricted to the lung mask, and traced into external contours. The largest
//! contour (by polygon area) supplies the area and compactness features.
use crate::image::{BinaryMask, GrayImageU8};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use serde::Serialize;
use std::f64::consts::PI;

/// Threshold used when the lung mask is empty.
const FALLBACK_THRESHOLD: f64 = 127.0;
/// Standard deviations above the lung mean that count as opacity.
pub const OPACITY_STD_FACTOR: f64 = 1.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpacityStats {
    pub threshold: f64,
    pub max_area: f64,
    pub max_compactness: f64,
    pub count: usize,
}

/// Opacity statistics of `img` within `lung_mask`.
pub fn analyze_opacities(img: &GrayImageU8, lung_mask: &BinaryMask) -> OpacityStats {
    let threshold = opacity_threshold(img, lung_mask);
    // 8-bit thresholding compares against the integer part of the level.
    let level = threshold.floor();
    let (w, h) = (img.width(), img.height());
    let bright = BinaryMask::from_fn(w, h, |x, y| img.get(x, y) as f64 > level);
    let opacity = bright.intersect(lung_mask);

    let contours: Vec<Contour<i32>> = find_contours::<i32>(&opacity.to_gray_image())
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .collect();

    let mut stats = OpacityStats {
        threshold,
        count: contours.len(),
        ..Default::default()
    };
    let mut best: Option<&Contour<i32>> = None;
    for contour in &contours {
        let area = polygon_area(&contour.points);
        if best.is_none() || area > stats.max_area {
            stats.max_area = area;
            best = Some(contour);
        }
    }
    if let Some(contour) = best {
        stats.max_compactness = compactness(stats.max_area, closed_perimeter(&contour.points));
    }
    log::debug!(
        "opacity: threshold {:.2}, {} contours, largest area {:.1}",
        threshold,
        stats.count,
        stats.max_area
    );
    stats
}

/// `mean + 1.5·std` of the lung pixels (population std).
pub fn opacity_threshold(img: &GrayImageU8, lung_mask: &BinaryMask) -> f64 {
    let data = img.data();
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0f64, 0.0f64);
    for idx in lung_mask.on_indices() {
        let v = data[idx] as f64;
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return FALLBACK_THRESHOLD;
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    mean + OPACITY_STD_FACTOR * var.sqrt()
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice as f64 / 2.0).abs()
}

/// Length of the closed polyline through `points`.
pub fn closed_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| {
            let dx = (q.x - p.x) as f64;
            let dy = (q.y - p.y) as f64;
            dx.hypot(dy)
        })
        .sum()
}

/// `4π·area / perimeter²`, `0.0` for a zero perimeter.
pub fn compactness(area: f64, perimeter: f64) -> f64 {
    if perimeter > 0.0 {
        4.0 * PI * area / (perimeter * perimeter)
    } else {
        0.0
    }
}
