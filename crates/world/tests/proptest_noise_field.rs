//! Property-based tests for the terrain noise field
//!
//! Critical invariants:
//! - `sample` is a pure function of (x, z) and configuration
//! - heights are always finite and inside the configured range

use proptest::prelude::*;
use wanderworld_world::{NoiseField, TerrainConfig};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: two samples at the same point are bit-identical, even far out.
    #[test]
    fn sample_determinism_at_extremes(
        seed in any::<u32>(),
        points in prop::collection::vec((-1.0e6f64..1.0e6f64, -1.0e6f64..1.0e6f64), 100),
    ) {
        let field = NoiseField::with_seed(seed);
        let twin = NoiseField::with_seed(seed);
        for (x, z) in points {
            let a = field.sample(x, z);
            prop_assert_eq!(a, field.sample(x, z));
            prop_assert_eq!(a.height.to_bits(), twin.sample(x, z).height.to_bits());
        }
    }

    /// Property: heights are finite and clamped for any input in range.
    #[test]
    fn heights_are_finite_and_bounded(
        seed in any::<u32>(),
        points in prop::collection::vec((-1.0e5f64..1.0e5f64, -1.0e5f64..1.0e5f64), 1000),
    ) {
        let field = NoiseField::with_seed(seed);
        let cfg = TerrainConfig::default();
        for (x, z) in points {
            let h = field.sample(x, z).height;
            prop_assert!(h.is_finite(), "non-finite height at ({}, {})", x, z);
            prop_assert!(
                h >= cfg.min_height && h <= cfg.max_height,
                "height {} out of range at ({}, {})", h, x, z
            );
        }
    }

    /// Property: a hostile shaping configuration still yields finite heights.
    #[test]
    fn extreme_shaping_never_leaks_non_finite(
        seed in any::<u32>(),
        peak in 1.0f64..400.0,
        valley in 0.01f64..400.0,
        x in -1.0e4f64..1.0e4f64,
        z in -1.0e4f64..1.0e4f64,
    ) {
        let mut cfg = TerrainConfig::default();
        cfg.shaping.peak_exponent = peak;
        cfg.shaping.cliff_exponent = peak;
        cfg.shaping.valley_exponent = valley;
        let field = NoiseField::new(seed, cfg.clone());
        let h = field.sample(x, z).height;
        prop_assert!(h.is_finite());
        prop_assert!(h >= cfg.min_height && h <= cfg.max_height);
    }
}
