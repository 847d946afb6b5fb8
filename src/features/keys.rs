//! Feature names shared by the extractor and the fusion engine.
//!
//! Zone and asymmetry keys are generated from the `Zone`/`Level` enums so the
//! two sides can never drift apart.
use crate::types::{Level, Zone};

pub const LUNG_AREA_RATIO: &str = "lung_area_ratio";
pub const GLOBAL_LUNG_MEAN: &str = "global_lung_mean";
pub const MAX_OPACITY_AREA: &str = "max_opacity_area";
pub const MAX_OPACITY_COMPACTNESS: &str = "max_opacity_compactness";
pub const OPACITY_COUNT: &str = "opacity_count";
pub const GABOR_MEAN_ENERGY: &str = "gabor_mean_energy";

/// Per-zone statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZoneStat {
    Mean,
    NormMean,
    Std,
    Entropy,
}

impl ZoneStat {
    pub const ALL: [ZoneStat; 4] = [
        ZoneStat::Mean,
        ZoneStat::NormMean,
        ZoneStat::Std,
        ZoneStat::Entropy,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ZoneStat::Mean => "mean",
            ZoneStat::NormMean => "norm_mean",
            ZoneStat::Std => "std",
            ZoneStat::Entropy => "entropy",
        }
    }
}

/// Left/right comparison computed per level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AsymmetryKind {
    /// From zone mean intensities.
    Opacity,
    /// From zone LBP entropies.
    Texture,
}

impl AsymmetryKind {
    pub const ALL: [AsymmetryKind; 2] = [AsymmetryKind::Opacity, AsymmetryKind::Texture];

    pub fn suffix(self) -> &'static str {
        match self {
            AsymmetryKind::Opacity => "opacity",
            AsymmetryKind::Texture => "texture",
        }
    }
}

/// `{zone}_{stat}`, e.g. `L_Upper_norm_mean`.
pub fn zone_key(zone: Zone, stat: ZoneStat) -> String {
    format!("{zone}_{}", stat.suffix())
}

/// `asym_{level}_{kind}`, e.g. `asym_Lower_opacity`.
pub fn asymmetry_key(level: Level, kind: AsymmetryKind) -> String {
    format!("asym_{}_{}", level.name(), kind.suffix())
}

/// Level named by an `asym_{level}_opacity` key.
pub fn opacity_asymmetry_level(key: &str) -> Option<&str> {
    key.strip_prefix("asym_")?.strip_suffix("_opacity")
}

/// Every key the extractor emits, in emission order.
pub fn all() -> Vec<String> {
    let mut keys = vec![LUNG_AREA_RATIO.to_string(), GLOBAL_LUNG_MEAN.to_string()];
    for zone in Zone::ALL {
        keys.extend(ZoneStat::ALL.iter().map(|&stat| zone_key(zone, stat)));
    }
    for level in Level::ALL {
        keys.extend(AsymmetryKind::ALL.iter().map(|&kind| asymmetry_key(level, kind)));
    }
    keys.extend(
        [
            MAX_OPACITY_AREA,
            MAX_OPACITY_COMPACTNESS,
            OPACITY_COUNT,
            GABOR_MEAN_ENERGY,
        ]
        .map(String::from),
    );
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use std::collections::BTreeSet;

    #[test]
    fn generated_names_match_expected_format() {
        let zone = Zone::new(Side::Right, Level::Lower);
        assert_eq!(zone_key(zone, ZoneStat::NormMean), "R_Lower_norm_mean");
        assert_eq!(
            asymmetry_key(Level::Middle, AsymmetryKind::Texture),
            "asym_Middle_texture"
        );
    }

    #[test]
    fn key_set_is_fixed_and_unique() {
        let keys = all();
        assert_eq!(keys.len(), 2 + 6 * 4 + 3 * 2 + 4);
        let unique: BTreeSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn opacity_asymmetry_level_parses_only_opacity_keys() {
        assert_eq!(opacity_asymmetry_level("asym_Upper_opacity"), Some("Upper"));
        assert_eq!(opacity_asymmetry_level("asym_Upper_texture"), None);
        assert_eq!(opacity_asymmetry_level("L_Upper_mean"), None);
    }
}
