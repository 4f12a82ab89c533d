//! Biome identifiers shared by terrain generation and entity scattering.

use serde::{Deserialize, Serialize};

/// Biome identifier.
///
/// The discriminant doubles as the per-vertex biome id written into chunk
/// payloads, so the order here is part of the payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BiomeId {
    /// Below water level with water present.
    Ocean = 0,
    /// Narrow band just above water level.
    Beach = 1,
    /// Temperate open land.
    Grassland = 2,
    /// Temperate, moist land.
    Forest = 3,
    /// Exposed stone at altitude or in dry/cold regions.
    Rocky = 4,
    /// High or cold peaks.
    Snow = 5,
    /// Below water level but dry.
    DryBasin = 6,
}

impl BiomeId {
    /// Number of biome variants.
    pub const COUNT: usize = 7;

    /// Get all biome IDs (for iteration).
    pub fn all() -> &'static [BiomeId] {
        &[
            BiomeId::Ocean,
            BiomeId::Beach,
            BiomeId::Grassland,
            BiomeId::Forest,
            BiomeId::Rocky,
            BiomeId::Snow,
            BiomeId::DryBasin,
        ]
    }

    /// Numeric id used in payload buffers.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Table index (same as the numeric id).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Decode a payload biome id.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::all().get(value as usize).copied()
    }

    /// Single-character glyph for ASCII debug maps.
    pub fn glyph(self) -> char {
        match self {
            BiomeId::Ocean => '~',
            BiomeId::Beach => '.',
            BiomeId::Grassland => '"',
            BiomeId::Forest => 'T',
            BiomeId::Rocky => '^',
            BiomeId::Snow => '*',
            BiomeId::DryBasin => '_',
        }
    }
}
