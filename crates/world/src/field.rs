//! Terrain height and biome synthesis.
//!
//! [`NoiseField`] maps world `(x, z)` to a [`TerrainSample`]. It is built once
//! from a root seed and a [`TerrainConfig`], holds no mutable state, and is
//! shared by reference (`Arc`) with every generation worker. Adjacent chunks
//! sample their shared edges independently, so `sample` must be a pure,
//! total function: same inputs, bit-identical outputs, never NaN.

use crate::biome::{classify_biome, correct_height, BiomeThresholds, Climate};
use crate::noise::{smoothstep, FbmNoise, NoiseLayerConfig};
use serde::{Deserialize, Serialize};
use wanderworld_core::BiomeId;

/// Offsets that decorrelate climate sampling from the height layers.
const TEMPERATURE_OFFSET: (f64, f64) = (10_000.0, -10_000.0);
const MOISTURE_OFFSET: (f64, f64) = (-20_000.0, 5_000.0);
const WATER_OFFSET: (f64, f64) = (7_500.0, 30_000.0);

/// Result of evaluating the field at one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    /// Final clamped height.
    pub height: f64,
    /// Biome of the column.
    pub biome: BiomeId,
}

/// Exponents and thresholds for the post-noise height shaping pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// Power applied to positive heights (> 1 sharpens peaks).
    pub peak_exponent: f64,
    /// Heights above this follow the steeper cliff curve.
    pub cliff_threshold: f64,
    /// Power applied to the part of a height above `cliff_threshold`.
    pub cliff_exponent: f64,
    /// Power applied to the magnitude of negative heights (< 1 broadens valleys).
    pub valley_exponent: f64,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            peak_exponent: 1.25,
            cliff_threshold: 40.0,
            cliff_exponent: 1.45,
            valley_exponent: 0.9,
        }
    }
}

/// Full terrain configuration: every noise layer plus shaping and biome rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Domain-warp layer.
    pub warp: NoiseLayerConfig,
    /// World units the warp layer may displace sampling coordinates.
    pub warp_strength: f64,
    /// Continents and mountains.
    pub base: NoiseLayerConfig,
    /// Ridged mountain crests.
    pub ridge: NoiseLayerConfig,
    /// Ridges only grow where the normalised base layer exceeds this.
    pub ridge_threshold: f64,
    /// Medium surface roughness.
    pub medium: NoiseLayerConfig,
    /// Multiplier applied to warped coordinates before sampling `medium`.
    pub medium_coordinate_scale: f64,
    /// Fine surface roughness (unwarped).
    pub fine: NoiseLayerConfig,
    /// Lower edge of the plains smoothstep over `1 - |base|`.
    pub plains_low: f64,
    /// Upper edge of the plains smoothstep over `1 - |base|`.
    pub plains_high: f64,
    /// How strongly plains damp the detail layers (0 = not at all).
    pub plains_detail_damping: f64,
    /// Temperature layer.
    pub temperature: NoiseLayerConfig,
    /// Moisture layer.
    pub moisture: NoiseLayerConfig,
    /// Water-presence layer.
    pub water: NoiseLayerConfig,
    /// Peak/valley shaping.
    pub shaping: ShapingConfig,
    /// Biome rules.
    pub biomes: BiomeThresholds,
    /// Lowest height the field returns.
    pub min_height: f64,
    /// Highest height the field returns.
    pub max_height: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            base: NoiseLayerConfig::new(0, 5, 0.5, 0.008, 30.0, true),
            warp: NoiseLayerConfig::new(1, 3, 0.4, 0.015, 1.0, false),
            warp_strength: 35.0,
            medium: NoiseLayerConfig::new(2, 4, 0.4, 0.03, 8.0, true),
            medium_coordinate_scale: 0.8,
            fine: NoiseLayerConfig::new(3, 3, 0.3, 0.1, 1.5, false),
            ridge: NoiseLayerConfig::new(4, 4, 0.5, 0.012, 18.0, true),
            ridge_threshold: 0.15,
            plains_low: 0.3,
            plains_high: 0.8,
            plains_detail_damping: 0.6,
            temperature: NoiseLayerConfig::new(5, 3, 0.5, 0.002, 1.0, false),
            moisture: NoiseLayerConfig::new(6, 3, 0.5, 0.0025, 1.0, false),
            water: NoiseLayerConfig::new(7, 2, 0.5, 0.004, 1.0, false),
            shaping: ShapingConfig::default(),
            biomes: BiomeThresholds::default(),
            min_height: -75.0,
            max_height: 200.0,
        }
    }
}

impl TerrainConfig {
    /// Named layers in pipeline order.
    pub fn layers(&self) -> [(&'static str, &NoiseLayerConfig); 8] {
        [
            ("warp", &self.warp),
            ("base", &self.base),
            ("ridge", &self.ridge),
            ("medium", &self.medium),
            ("fine", &self.fine),
            ("temperature", &self.temperature),
            ("moisture", &self.moisture),
            ("water", &self.water),
        ]
    }
}

/// Deterministic scalar field producing terrain height and biome.
pub struct NoiseField {
    root_seed: u32,
    config: TerrainConfig,
    warp: FbmNoise,
    base: FbmNoise,
    ridge: FbmNoise,
    medium: FbmNoise,
    fine: FbmNoise,
    temperature: FbmNoise,
    moisture: FbmNoise,
    water: FbmNoise,
}

impl NoiseField {
    /// Build every layer from the root seed.
    pub fn new(root_seed: u32, config: TerrainConfig) -> Self {
        Self {
            root_seed,
            warp: FbmNoise::new(root_seed, &config.warp),
            base: FbmNoise::new(root_seed, &config.base),
            ridge: FbmNoise::new(root_seed, &config.ridge),
            medium: FbmNoise::new(root_seed, &config.medium),
            fine: FbmNoise::new(root_seed, &config.fine),
            temperature: FbmNoise::new(root_seed, &config.temperature),
            moisture: FbmNoise::new(root_seed, &config.moisture),
            water: FbmNoise::new(root_seed, &config.water),
            config,
        }
    }

    /// Field with the default terrain configuration.
    pub fn with_seed(root_seed: u32) -> Self {
        Self::new(root_seed, TerrainConfig::default())
    }

    /// Root seed every layer was derived from.
    pub fn root_seed(&self) -> u32 {
        self.root_seed
    }

    /// Configuration the field was built with.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Evaluate height and biome at world `(x, z)`.
    pub fn sample(&self, x: f64, z: f64) -> TerrainSample {
        let cfg = &self.config;
        let shaped = self.shaped_height(x, z);
        let climate = self.climate(x, z, shaped);
        let biome = classify_biome(shaped, climate, &cfg.biomes);

        let corrected = finite_or_zero(correct_height(biome, shaped, &cfg.biomes));
        let height = finite_or_zero(corrected.clamp(cfg.min_height, cfg.max_height));

        TerrainSample { height, biome }
    }

    /// Height only (convenience for debug tooling).
    pub fn height(&self, x: f64, z: f64) -> f64 {
        self.sample(x, z).height
    }

    /// Height after noise layering and shaping, before biome correction.
    pub fn shaped_height(&self, x: f64, z: f64) -> f64 {
        let cfg = &self.config;

        let (wx, wz) = self.warped(x, z);
        let (bx, bz) = if cfg.base.warp { (wx, wz) } else { (x, z) };
        let base = self.base.sample(bx, bz);
        let plains = smoothstep(cfg.plains_low, cfg.plains_high, 1.0 - base.abs());

        let mut height = base * cfg.base.amplitude;

        if base > cfg.ridge_threshold {
            let (rx, rz) = if cfg.ridge.warp { (wx, wz) } else { (x, z) };
            let crest = 1.0 - self.ridge.sample(rx, rz).abs();
            height += crest * crest * cfg.ridge.amplitude * (1.0 - plains);
        }

        let detail_scale = 1.0 - cfg.plains_detail_damping * plains;
        let (mx, mz) = if cfg.medium.warp { (wx, wz) } else { (x, z) };
        let medium = self.medium.sample(
            mx * cfg.medium_coordinate_scale,
            mz * cfg.medium_coordinate_scale,
        ) * cfg.medium.amplitude;
        let (fx, fz) = if cfg.fine.warp { (wx, wz) } else { (x, z) };
        let fine = self.fine.sample(fx, fz) * cfg.fine.amplitude;
        height += (medium + fine) * detail_scale;

        shape_height(height, &cfg.shaping)
    }

    /// Climate at `(x, z)` for a column of the given shaped height.
    pub fn climate(&self, x: f64, z: f64, height: f64) -> Climate {
        let t = &self.config.biomes;
        let raw_temperature = self
            .temperature
            .sample_unit(x + TEMPERATURE_OFFSET.0, z + TEMPERATURE_OFFSET.1);
        let temperature =
            (raw_temperature - height.max(0.0) * t.temperature_lapse).clamp(0.0, 1.0);
        let moisture = self
            .moisture
            .sample_unit(x + MOISTURE_OFFSET.0, z + MOISTURE_OFFSET.1);
        let water_presence = self
            .water
            .sample_unit(x + WATER_OFFSET.0, z + WATER_OFFSET.1);

        Climate {
            temperature,
            moisture,
            water_presence,
        }
    }

    fn warped(&self, x: f64, z: f64) -> (f64, f64) {
        let strength = self.config.warp_strength;
        // Swapped arguments decorrelate the two axes.
        let warp_x = self.warp.sample(x, z) * strength;
        let warp_z = self.warp.sample(z, x) * strength;
        (x + warp_x, z + warp_z)
    }
}

/// Raise peaks, apply the cliff curve, and broaden valleys.
///
/// Falls back to the unshaped value when exponentiation is not finite.
pub fn shape_height(height: f64, shaping: &ShapingConfig) -> f64 {
    let shaped = if height > 0.0 {
        if height > shaping.cliff_threshold {
            shaping.cliff_threshold.powf(shaping.peak_exponent)
                + (height - shaping.cliff_threshold).powf(shaping.cliff_exponent)
        } else {
            height.powf(shaping.peak_exponent)
        }
    } else {
        -height.abs().powf(shaping.valley_exponent)
    };

    if shaped.is_finite() {
        shaped
    } else {
        finite_or_zero(height)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
