//! Biome classification and biome-specific height correction.
//!
//! Classification is an ordered list of threshold rules; the first rule that
//! matches wins. All thresholds are configuration so worlds can be retuned
//! without touching code.

use crate::noise::smoothstep;
use serde::{Deserialize, Serialize};
use wanderworld_core::BiomeId;

/// Tunable thresholds for biome assignment and per-biome height correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeThresholds {
    /// Heights below this are under water.
    pub water_level: f64,
    /// Water-presence noise above this turns sub-water-level ground into ocean.
    pub water_presence_threshold: f64,
    /// Heights below this (and above water) are beach.
    pub beach_max: f64,
    /// Heights above this are always snow.
    pub snow_line: f64,
    /// Heights above this are rocky, or snowy when cold.
    pub rocky_line: f64,
    /// Temperature below this counts as cold.
    pub cold_temperature: f64,
    /// Moisture above this makes cold land rocky instead of grassland.
    pub cold_moisture: f64,
    /// Moisture above this grows forest.
    pub forest_moisture: f64,
    /// Moisture above this (and below forest) is grassland.
    pub grassland_moisture: f64,
    /// Height of the beach band above water level after correction.
    pub beach_band: f64,
    /// Floor that dry basins are pulled down toward.
    pub basin_floor: f64,
    /// Fraction of the distance to the basin floor applied at full depth.
    pub basin_blend: f64,
    /// Depth below water level over which the basin pull fades in.
    pub basin_transition: f64,
    /// Minimum depth of ocean floor below water level.
    pub ocean_min_depth: f64,
    /// Temperature lost per unit of height above zero.
    pub temperature_lapse: f64,
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        Self {
            water_level: -6.0,
            water_presence_threshold: 0.475,
            beach_max: -4.0,
            snow_line: 110.0,
            rocky_line: 65.0,
            cold_temperature: 0.3,
            cold_moisture: 0.6,
            forest_moisture: 0.55,
            grassland_moisture: 0.35,
            beach_band: 2.0,
            basin_floor: -30.0,
            basin_blend: 0.4,
            basin_transition: 4.0,
            ocean_min_depth: 0.5,
            temperature_lapse: 0.004,
        }
    }
}

/// Climate inputs for one column, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    /// Temperature after elevation cooling.
    pub temperature: f64,
    /// Moisture.
    pub moisture: f64,
    /// Secondary water-presence noise.
    pub water_presence: f64,
}

/// Assign a biome from shaped height and climate. First matching rule wins.
pub fn classify_biome(height: f64, climate: Climate, t: &BiomeThresholds) -> BiomeId {
    let cold = climate.temperature < t.cold_temperature;

    if height < t.water_level {
        if climate.water_presence > t.water_presence_threshold {
            BiomeId::Ocean
        } else {
            BiomeId::DryBasin
        }
    } else if height < t.beach_max {
        BiomeId::Beach
    } else if height > t.snow_line {
        BiomeId::Snow
    } else if height > t.rocky_line {
        if cold {
            BiomeId::Snow
        } else {
            BiomeId::Rocky
        }
    } else if cold {
        if climate.moisture > t.cold_moisture {
            BiomeId::Rocky
        } else {
            BiomeId::Grassland
        }
    } else if climate.moisture > t.forest_moisture {
        BiomeId::Forest
    } else if climate.moisture > t.grassland_moisture {
        BiomeId::Grassland
    } else {
        BiomeId::Rocky
    }
}

/// Reshape a column's height according to its biome.
///
/// Beaches are squeezed into a smooth band above water, dry basins sink
/// toward their floor, and ocean floors stay below water level.
pub fn correct_height(biome: BiomeId, height: f64, t: &BiomeThresholds) -> f64 {
    match biome {
        BiomeId::Beach => {
            let span = t.beach_max - t.water_level;
            let progress = if span > 0.0 {
                (height - t.water_level) / span
            } else {
                0.0
            };
            t.water_level + t.beach_band * smoothstep(0.0, 1.0, progress)
        }
        BiomeId::DryBasin => {
            let depth = t.water_level - height;
            let pull = t.basin_blend * smoothstep(0.0, t.basin_transition, depth);
            // Only ever deepens: ground already under the floor stays put.
            height + (t.basin_floor - height).min(0.0) * pull
        }
        BiomeId::Ocean => height.min(t.water_level - t.ocean_min_depth),
        _ => height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(temperature: f64, moisture: f64, water_presence: f64) -> Climate {
        Climate {
            temperature,
            moisture,
            water_presence,
        }
    }

    #[test]
    fn water_presence_splits_ocean_and_dry_basin() {
        let t = BiomeThresholds {
            water_level: -6.0,
            ..Default::default()
        };
        assert_eq!(
            classify_biome(-10.0, climate(0.5, 0.5, 0.9), &t),
            BiomeId::Ocean
        );
        assert_eq!(
            classify_biome(-10.0, climate(0.5, 0.5, 0.1), &t),
            BiomeId::DryBasin
        );
    }

    #[test]
    fn threshold_is_exclusive_for_ocean() {
        let t = BiomeThresholds::default();
        let at = climate(0.5, 0.5, t.water_presence_threshold);
        assert_eq!(classify_biome(-10.0, at, &t), BiomeId::DryBasin);
    }

    #[test]
    fn beach_sits_between_water_and_beach_max() {
        let t = BiomeThresholds::default();
        assert_eq!(
            classify_biome(-5.0, climate(0.5, 0.9, 0.9), &t),
            BiomeId::Beach
        );
    }

    #[test]
    fn altitude_rules() {
        let t = BiomeThresholds::default();
        assert_eq!(
            classify_biome(120.0, climate(0.9, 0.1, 0.0), &t),
            BiomeId::Snow
        );
        assert_eq!(
            classify_biome(80.0, climate(0.1, 0.1, 0.0), &t),
            BiomeId::Snow
        );
        assert_eq!(
            classify_biome(80.0, climate(0.8, 0.1, 0.0), &t),
            BiomeId::Rocky
        );
    }

    #[test]
    fn cold_lowlands() {
        let t = BiomeThresholds::default();
        assert_eq!(
            classify_biome(10.0, climate(0.1, 0.9, 0.0), &t),
            BiomeId::Rocky
        );
        assert_eq!(
            classify_biome(10.0, climate(0.1, 0.2, 0.0), &t),
            BiomeId::Grassland
        );
    }

    #[test]
    fn temperate_moisture_bands() {
        let t = BiomeThresholds::default();
        assert_eq!(
            classify_biome(10.0, climate(0.6, 0.8, 0.0), &t),
            BiomeId::Forest
        );
        assert_eq!(
            classify_biome(10.0, climate(0.6, 0.45, 0.0), &t),
            BiomeId::Grassland
        );
        assert_eq!(
            classify_biome(10.0, climate(0.6, 0.1, 0.0), &t),
            BiomeId::Rocky
        );
    }

    #[test]
    fn beach_correction_stays_in_band() {
        let t = BiomeThresholds::default();
        for i in 0..=20 {
            let h = t.water_level + (t.beach_max - t.water_level) * i as f64 / 20.0;
            let corrected = correct_height(BiomeId::Beach, h, &t);
            assert!(corrected >= t.water_level);
            assert!(corrected <= t.water_level + t.beach_band);
        }
    }

    #[test]
    fn dry_basin_sinks_but_is_continuous_at_water_level() {
        let t = BiomeThresholds::default();
        let at_surface = correct_height(BiomeId::DryBasin, t.water_level, &t);
        assert!((at_surface - t.water_level).abs() < 1e-9);
        let deep = correct_height(BiomeId::DryBasin, t.water_level - 10.0, &t);
        assert!(deep < t.water_level - 10.0);
        assert!(deep > t.basin_floor);
    }

    #[test]
    fn dry_basin_below_its_floor_is_not_raised() {
        let t = BiomeThresholds::default();
        assert_eq!(correct_height(BiomeId::DryBasin, -50.0, &t), -50.0);
        assert_eq!(correct_height(BiomeId::DryBasin, t.basin_floor, &t), t.basin_floor);
        let just_above = correct_height(BiomeId::DryBasin, -29.0, &t);
        assert!(just_above < -29.0 && just_above >= t.basin_floor);
    }

    #[test]
    fn ocean_floor_stays_below_water() {
        let t = BiomeThresholds::default();
        let corrected = correct_height(BiomeId::Ocean, t.water_level - 0.1, &t);
        assert!(corrected <= t.water_level - t.ocean_min_depth);
    }

    #[test]
    fn land_biomes_are_untouched() {
        let t = BiomeThresholds::default();
        assert_eq!(correct_height(BiomeId::Forest, 12.5, &t), 12.5);
    }
}
