//! Noise generation utilities for terrain generation.
//!
//! Provides seeded fractal Brownian motion (fBm) layers built on OpenSimplex
//! noise. Every layer derives its seed from the world's root seed so a single
//! number reproduces the whole world.

use noise::{NoiseFn, OpenSimplex};
use serde::{Deserialize, Serialize};

/// Configuration for one multi-octave noise layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayerConfig {
    /// Added to the root seed to get this layer's seed.
    pub seed_offset: u32,
    /// Number of octaves (layers of detail).
    pub octaves: u32,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Base frequency of the first octave; doubles every octave.
    pub scale: f64,
    /// Output multiplier applied by the height pipeline.
    pub amplitude: f64,
    /// Whether this layer samples domain-warped coordinates.
    pub warp: bool,
}

impl Default for NoiseLayerConfig {
    fn default() -> Self {
        Self {
            seed_offset: 0,
            octaves: 4,
            persistence: 0.5,
            scale: 0.01,
            amplitude: 1.0,
            warp: false,
        }
    }
}

impl NoiseLayerConfig {
    /// Convenience constructor used by the terrain presets.
    pub fn new(
        seed_offset: u32,
        octaves: u32,
        persistence: f64,
        scale: f64,
        amplitude: f64,
        warp: bool,
    ) -> Self {
        Self {
            seed_offset,
            octaves,
            persistence,
            scale,
            amplitude,
            warp,
        }
    }

    /// Seed of this layer for the given root seed.
    pub fn seed(&self, root_seed: u32) -> u32 {
        root_seed.wrapping_add(self.seed_offset)
    }
}

/// Fractal Brownian motion over one OpenSimplex generator.
pub struct FbmNoise {
    simplex: OpenSimplex,
    octaves: u32,
    persistence: f64,
    scale: f64,
}

impl FbmNoise {
    /// Create a layer for `root_seed` using `config`.
    pub fn new(root_seed: u32, config: &NoiseLayerConfig) -> Self {
        Self {
            simplex: OpenSimplex::new(config.seed(root_seed)),
            octaves: config.octaves,
            persistence: config.persistence,
            scale: config.scale,
        }
    }

    /// Raw single-octave noise at `(x, y)`, roughly in [-1.0, 1.0].
    pub fn raw(&self, x: f64, y: f64) -> f64 {
        self.simplex.get([x, y])
    }

    /// Multi-octave sample normalised by the sum of amplitudes.
    ///
    /// Returns value in range [-1.0, 1.0]. Zero octaves yields 0.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        fbm(
            |sx, sy| self.simplex.get([sx, sy]),
            x,
            y,
            self.octaves,
            self.persistence,
            self.scale,
        )
        .clamp(-1.0, 1.0)
    }

    /// Sample remapped from [-1, 1] to [0, 1].
    pub fn sample_unit(&self, x: f64, y: f64) -> f64 {
        ((self.sample(x, y) + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

/// Accumulate `octaves` of `noise`, doubling frequency and scaling amplitude by
/// `persistence` each octave.
pub fn fbm<F>(noise: F, x: f64, y: f64, octaves: u32, persistence: f64, scale: f64) -> f64
where
    F: Fn(f64, f64) -> f64,
{
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = scale;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += noise(x * frequency, y * frequency) * amplitude;
        max_value += amplitude;

        amplitude *= persistence;
        frequency *= 2.0;
    }

    if max_value == 0.0 {
        0.0
    } else {
        total / max_value
    }
}

/// Hermite interpolation between `edge0` and `edge1`.
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
