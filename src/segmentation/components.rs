//! Connected-component filtering of the thresholded lung candidate mask.
//!
//! - Label 8-connected foreground regions with `imageproc::region_labelling`.
//! - Keep the `max_regions` largest (by pixel count) whose area exceeds
//!   `min_area_fraction` of the image.
//! - Fill interior holes of the kept union.
use crate::image::BinaryMask;
use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::VecDeque;

/// A kept component, reported through the segmentation diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Region {
    pub label: u32,
    pub area: usize,
}

/// Result of [`keep_largest_regions`].
#[derive(Clone, Debug)]
pub struct ComponentSelection {
    pub mask: BinaryMask,
    /// Number of foreground components before filtering.
    pub component_count: usize,
    pub kept: Vec<Region>,
}

/// Keep at most `max_regions` components larger than `min_area_fraction` of the image.
pub fn keep_largest_regions(
    mask: &BinaryMask,
    max_regions: usize,
    min_area_fraction: f64,
) -> ComponentSelection {
    let (w, h) = (mask.width(), mask.height());
    if mask.is_empty() {
        return ComponentSelection {
            mask: mask.clone(),
            component_count: 0,
            kept: Vec::new(),
        };
    }
    let labels = connected_components(&mask.to_gray_image(), Connectivity::Eight, Luma([0u8]));

    let mut areas: Vec<usize> = Vec::new();
    for px in labels.pixels() {
        let label = px[0] as usize;
        if label == 0 {
            continue;
        }
        if areas.len() < label {
            areas.resize(label, 0);
        }
        areas[label - 1] += 1;
    }

    let mut regions: Vec<Region> = areas
        .iter()
        .enumerate()
        .filter(|(_, &area)| area > 0)
        .map(|(i, &area)| Region {
            label: i as u32 + 1,
            area,
        })
        .collect();
    let component_count = regions.len();
    regions.sort_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));

    let min_area = min_area_fraction * (w * h) as f64;
    let kept: Vec<Region> = regions
        .into_iter()
        .take(max_regions)
        .filter(|r| r.area as f64 > min_area)
        .collect();
    log::debug!(
        "components: {} found, kept {:?} (min area {:.0})",
        component_count,
        kept.iter().map(|r| r.area).collect::<Vec<_>>(),
        min_area
    );

    let out = BinaryMask::from_fn(w, h, |x, y| {
        let label = labels.get_pixel(x as u32, y as u32)[0];
        label != 0 && kept.iter().any(|r| r.label == label)
    });
    ComponentSelection {
        mask: fill_holes(&out),
        component_count,
        kept,
    }
}

/// Turn on every off pixel that is not 4-connected to the image border.
pub fn fill_holes(mask: &BinaryMask) -> BinaryMask {
    let (w, h) = (mask.width(), mask.height());
    if w == 0 || h == 0 {
        return mask.clone();
    }
    let mut outside = vec![false; w * h];
    let mut queue = VecDeque::new();
    let seed = |x: usize, y: usize, outside: &mut [bool], queue: &mut VecDeque<usize>| {
        let idx = y * w + x;
        if !mask.is_on_index(idx) && !outside[idx] {
            outside[idx] = true;
            queue.push_back(idx);
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, h - 1, &mut outside, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut queue);
        seed(w - 1, y, &mut outside, &mut queue);
    }
    while let Some(idx) = queue.pop_front() {
        let (x, y) = (idx % w, idx / w);
        if x > 0 {
            seed(x - 1, y, &mut outside, &mut queue);
        }
        if x + 1 < w {
            seed(x + 1, y, &mut outside, &mut queue);
        }
        if y > 0 {
            seed(x, y - 1, &mut outside, &mut queue);
        }
        if y + 1 < h {
            seed(x, y + 1, &mut outside, &mut queue);
        }
    }
    BinaryMask::from_fn(w, h, |x, y| !outside[y * w + x])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(mask: &mut BinaryMask, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.set(x, y, true);
            }
        }
    }

    #[test]
    fn keeps_two_largest_regions_above_area_floor() {
        let mut mask = BinaryMask::new(100, 100);
        rect(&mut mask, 5, 5, 35, 45); // 1200
        rect(&mut mask, 60, 5, 90, 40); // 1050
        rect(&mut mask, 40, 70, 60, 90); // 400, third largest
        rect(&mut mask, 0, 95, 2, 97); // speck
        let sel = keep_largest_regions(&mask, 2, 0.05);
        assert_eq!(sel.component_count, 4);
        assert_eq!(sel.kept.len(), 2);
        assert_eq!(sel.mask.count_on(), 1200 + 1050);
        assert!(!sel.mask.is_on(50, 80));
    }

    #[test]
    fn drops_regions_at_or_below_the_floor() {
        let mut mask = BinaryMask::new(100, 100);
        rect(&mut mask, 10, 10, 30, 35); // exactly 5% = 500
        let sel = keep_largest_regions(&mask, 2, 0.05);
        assert!(sel.kept.is_empty());
        assert_eq!(sel.mask.count_on(), 0);
    }

    #[test]
    fn diagonal_neighbours_form_one_component() {
        let mask = BinaryMask::from_fn(10, 10, |x, y| x == y);
        let sel = keep_largest_regions(&mask, 2, 0.0);
        assert_eq!(sel.component_count, 1);
        assert_eq!(sel.mask.count_on(), 10);
    }

    #[test]
    fn fills_enclosed_hole_but_not_open_bay() {
        let mut mask = BinaryMask::new(30, 30);
        rect(&mut mask, 2, 2, 12, 12);
        mask.set(6, 6, false);
        mask.set(7, 6, false);
        // U shape open to the bottom border
        rect(&mut mask, 15, 0, 28, 20);
        for y in 5..30 {
            mask.set(21, y, false);
        }
        let filled = fill_holes(&mask);
        assert!(filled.is_on(6, 6) && filled.is_on(7, 6));
        assert!(!filled.is_on(21, 10));
    }
}
