//! Partition of a lung mask into six anatomical zones.
//!
//! The mask is split at the centroid column (image-left half is the patient's
//! right lung) and into three equal bands of its vertical extent.
use crate::image::{BinaryMask, GrayImageU8};
use crate::types::{Level, Side, Zone};

/// Geometry used to split the mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ZoneLayout {
    /// First column of the anatomical left lung (`x >= split_x`).
    pub split_x: usize,
    pub top: usize,
    /// Exclusive.
    pub bottom: usize,
    pub third: usize,
}

impl ZoneLayout {
    /// Layout of `mask`; an empty mask spans the full height and splits at `w / 2`.
    pub fn of(mask: &BinaryMask) -> Self {
        let (w, h) = (mask.width(), mask.height());
        let mut count = 0u64;
        let mut sum_x = 0u64;
        let mut top = usize::MAX;
        let mut bottom = 0usize;
        for y in 0..h {
            for x in 0..w {
                if mask.is_on(x, y) {
                    count += 1;
                    sum_x += x as u64;
                    top = top.min(y);
                    bottom = y + 1;
                }
            }
        }
        let (split_x, top, bottom) = if count == 0 {
            (w / 2, 0, h)
        } else {
            ((sum_x / count) as usize, top, bottom)
        };
        Self {
            split_x,
            top,
            bottom,
            third: (bottom - top) / 3,
        }
    }

    pub fn side_of(&self, x: usize) -> Side {
        if x < self.split_x {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// Band containing row `y`, `None` outside `[top, bottom)`.
    pub fn level_of(&self, y: usize) -> Option<Level> {
        if y < self.top || y >= self.bottom {
            None
        } else if y < self.top + self.third {
            Some(Level::Upper)
        } else if y < self.top + 2 * self.third {
            Some(Level::Middle)
        } else {
            Some(Level::Lower)
        }
    }

    pub fn zone_of(&self, x: usize, y: usize) -> Option<Zone> {
        self.level_of(y).map(|level| Zone::new(self.side_of(x), level))
    }
}

/// One mask per [`Zone`], indexed in [`Zone::ALL`] order.
#[derive(Clone, Debug)]
pub struct ZoneMasks {
    layout: ZoneLayout,
    masks: [BinaryMask; 6],
}

impl ZoneMasks {
    pub fn from_mask(mask: &BinaryMask) -> Self {
        let layout = ZoneLayout::of(mask);
        let (w, h) = (mask.width(), mask.height());
        let mut masks: [BinaryMask; 6] = std::array::from_fn(|_| BinaryMask::new(w, h));
        for y in 0..h {
            for x in 0..w {
                if !mask.is_on(x, y) {
                    continue;
                }
                if let Some(zone) = layout.zone_of(x, y) {
                    masks[zone.index()].set(x, y, true);
                }
            }
        }
        Self { layout, masks }
    }

    pub fn layout(&self) -> ZoneLayout {
        self.layout
    }

    pub fn get(&self, zone: Zone) -> &BinaryMask {
        &self.masks[zone.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Zone, &BinaryMask)> {
        Zone::ALL.into_iter().zip(self.masks.iter())
    }

    /// Label map with `zone.index() + 1` per zone pixel and 0 elsewhere.
    pub fn label_map(&self) -> Vec<u8> {
        let len = self.masks[0].len();
        let mut out = vec![0u8; len];
        for (zone, mask) in self.iter() {
            for idx in mask.on_indices() {
                out[idx] = zone.index() as u8 + 1;
            }
        }
        out
    }

    /// Label map scaled for viewing: zone `k` (1..=6) at intensity `40·k`.
    pub fn label_image(&self) -> GrayImageU8 {
        let (w, h) = (self.masks[0].width(), self.masks[0].height());
        GrayImageU8::new(w, h, self.label_map().iter().map(|&l| l * 40).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_uses_full_height_and_centre_split() {
        let layout = ZoneLayout::of(&BinaryMask::new(10, 9));
        assert_eq!(layout.split_x, 5);
        assert_eq!((layout.top, layout.bottom, layout.third), (0, 9, 3));
        let zones = ZoneMasks::from_mask(&BinaryMask::new(10, 9));
        assert!(zones.iter().all(|(_, m)| m.count_on() == 0));
    }

    #[test]
    fn image_left_half_is_anatomical_right() {
        let mask = BinaryMask::from_fn(20, 12, |x, _| x < 4 || x >= 16);
        let zones = ZoneMasks::from_mask(&mask);
        let right_upper = zones.get(Zone::new(Side::Right, Level::Upper));
        let left_lower = zones.get(Zone::new(Side::Left, Level::Lower));
        assert!(right_upper.is_on(0, 0));
        assert!(!right_upper.is_on(19, 0));
        assert!(left_lower.is_on(19, 11));
    }

    #[test]
    fn remainder_rows_fall_into_lower_band() {
        let mask = BinaryMask::from_fn(6, 20, |_, y| (2..12).contains(&y));
        let layout = ZoneLayout::of(&mask);
        assert_eq!((layout.top, layout.bottom, layout.third), (2, 12, 3));
        assert_eq!(layout.level_of(4), Some(Level::Upper));
        assert_eq!(layout.level_of(7), Some(Level::Middle));
        assert_eq!(layout.level_of(11), Some(Level::Lower));
        assert_eq!(layout.level_of(12), None);
    }

    #[test]
    fn zones_partition_the_mask() {
        let mask = BinaryMask::from_fn(31, 27, |x, y| (x * 7 + y * 3) % 5 != 0);
        let zones = ZoneMasks::from_mask(&mask);
        let total: usize = zones.iter().map(|(_, m)| m.count_on()).sum();
        assert_eq!(total, mask.count_on());
        let labels = zones.label_map();
        for idx in 0..mask.len() {
            assert_eq!(labels[idx] != 0, mask.is_on_index(idx));
        }
    }
}
