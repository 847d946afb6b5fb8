mod common;

use common::synthetic_image::{blank, radiograph, OPACITY_CENTRE, SIZE};
use cxr_coach::segmentation::{calculate_lung_area_ratio, get_zonal_masks, LungSegmenter};
use cxr_coach::types::{Level, Side, Zone};

#[test]
fn finds_both_lungs_on_synthetic_radiograph() {
    common::init_logging();
    let segmenter = LungSegmenter::default();
    let img = segmenter.preprocess(&radiograph(true));
    let (mask, diag) = segmenter.segment_lungs_detailed(&img);

    assert_eq!((mask.width(), mask.height()), (SIZE, SIZE));
    assert_eq!(diag.kept_regions.len(), 2, "diag: {diag:?}");
    let ratio = calculate_lung_area_ratio(&mask);
    assert!(
        (0.12..0.25).contains(&ratio),
        "lung area ratio {ratio} outside the expected band"
    );
    assert!((ratio - diag.lung_area_ratio).abs() < 1e-12);
    assert!(!diag.is_degraded());
    // Dark border rows are too small to count as lung.
    assert!(!mask.is_on(SIZE / 2, 2));
}

#[test]
fn bright_opacity_inside_lung_is_kept() {
    let segmenter = LungSegmenter::default();
    let img = segmenter.preprocess(&radiograph(true));
    let mask = segmenter.segment_lungs(&img);
    let (cx, cy) = (OPACITY_CENTRE.0 as usize, OPACITY_CENTRE.1 as usize);
    assert!(mask.is_on(cx, cy), "opacity centre should be filled into the lung");
}

#[test]
fn zones_split_lungs_by_side_and_level() {
    let segmenter = LungSegmenter::default();
    let img = segmenter.preprocess(&radiograph(true));
    let mask = segmenter.segment_lungs(&img);
    let zones = get_zonal_masks(&mask);
    let layout = zones.layout();

    assert!(
        (222..=290).contains(&layout.split_x),
        "split {} should fall between the lungs",
        layout.split_x
    );
    let total: usize = zones.iter().map(|(_, m)| m.count_on()).sum();
    assert_eq!(total, mask.count_on());
    for (zone, m) in zones.iter() {
        assert!(m.count_on() > 0, "zone {zone} is empty");
    }
    let (cx, cy) = (OPACITY_CENTRE.0 as usize, OPACITY_CENTRE.1 as usize);
    let r_lower = Zone::new(Side::Right, Level::Lower);
    assert!(zones.get(r_lower).is_on(cx, cy));
}

#[test]
fn blank_image_yields_empty_mask_and_full_height_layout() {
    let segmenter = LungSegmenter::default();
    let img = segmenter.preprocess(&blank(128, 300, 200));
    assert_eq!((img.width(), img.height()), (SIZE, SIZE));
    let (mask, diag) = segmenter.segment_lungs_detailed(&img);
    assert_eq!(mask.count_on(), 0);
    assert_eq!(calculate_lung_area_ratio(&mask), 0.0);
    assert!(diag.is_degraded());

    let zones = get_zonal_masks(&mask);
    let layout = zones.layout();
    assert_eq!(layout.split_x, SIZE / 2);
    assert_eq!((layout.top, layout.bottom), (0, SIZE));
    assert!(zones.iter().all(|(_, m)| m.count_on() == 0));
}

#[test]
fn segmentation_is_deterministic() {
    let segmenter = LungSegmenter::default();
    let img = segmenter.preprocess(&radiograph(true));
    assert_eq!(segmenter.segment_lungs(&img), segmenter.segment_lungs(&img));
}
