//! Chunk addressing on the infinite XZ grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    /// Chunk index along world X.
    pub x: i32,
    /// Chunk index along world Z.
    pub z: i32,
}

impl ChunkKey {
    /// Create a key from chunk indices.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the world position `(x, z)` for chunks of `chunk_size` units.
    ///
    /// Indices beyond the `i32` range saturate at the edge of the grid.
    pub fn from_world(x: f64, z: f64, chunk_size: f64) -> Self {
        Self {
            x: (x / chunk_size).floor() as i32,
            z: (z / chunk_size).floor() as i32,
        }
    }

    /// World-space offset of this chunk's origin.
    pub fn world_offset(self, chunk_size: f64) -> (f64, f64) {
        (self.x as f64 * chunk_size, self.z as f64 * chunk_size)
    }

    /// Offset this key by whole chunks, saturating at the edge of the grid.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.z.saturating_add(dz))
    }

    /// Chebyshev distance in chunks, saturating at `i32::MAX`.
    pub fn chebyshev_distance(self, other: Self) -> i32 {
        let d = self.x.abs_diff(other.x).max(self.z.abs_diff(other.z));
        i32::try_from(d).unwrap_or(i32::MAX)
    }

    /// Hash that is identical across runs and platforms (unlike `std` hashers).
    pub fn stable_hash(self) -> u64 {
        let x = self.x as u32 as u64;
        let z = self.z as u32 as u64;
        // SplitMix64 finaliser over the packed pair.
        let mut h = (x << 32) | z;
        h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        h ^ (h >> 31)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_world_floors_negative_coordinates() {
        assert_eq!(ChunkKey::from_world(0.0, 0.0, 128.0), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(127.9, 5.0, 128.0), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(-0.1, -128.0, 128.0), ChunkKey::new(-1, -1));
        assert_eq!(
            ChunkKey::from_world(-128.1, 256.0, 128.0),
            ChunkKey::new(-2, 2)
        );
    }

    #[test]
    fn display_matches_comma_form() {
        assert_eq!(ChunkKey::new(-3, 12).to_string(), "-3,12");
    }

    #[test]
    fn stable_hash_distinguishes_neighbours() {
        let a = ChunkKey::new(1, 0).stable_hash();
        let b = ChunkKey::new(0, 1).stable_hash();
        assert_ne!(a, b);
        assert_eq!(a, ChunkKey::new(1, 0).stable_hash());
    }

    #[test]
    fn chebyshev_distance_is_max_axis() {
        let a = ChunkKey::new(0, 0);
        assert_eq!(a.chebyshev_distance(ChunkKey::new(2, -1)), 2);
        assert_eq!(a.chebyshev_distance(ChunkKey::new(-3, 3)), 3);
    }

    #[test]
    fn grid_edges_saturate_instead_of_overflowing() {
        let edge = ChunkKey::from_world(3.0e11, -3.0e11, 64.0);
        assert_eq!(edge, ChunkKey::new(i32::MAX, i32::MIN));
        assert_eq!(edge.offset(1, -1), edge);
        assert_eq!(edge.offset(-1, 1), ChunkKey::new(i32::MAX - 1, i32::MIN + 1));
        assert_eq!(
            ChunkKey::new(i32::MIN, 0).chebyshev_distance(ChunkKey::new(i32::MAX, 0)),
            i32::MAX
        );
    }
}
