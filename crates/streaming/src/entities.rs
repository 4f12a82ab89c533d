//! Decorative entity scattering over chunk footprints.
//!
//! Each entity type owns an [`InstancePool`]: a fixed number of GPU instance
//! slots shared by the whole world. Chunks borrow slots when they are
//! realized and hand them back when evicted. Running out of slots is normal
//! and simply drops the placement.

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f32::consts::TAU;
use std::path::Path;
use tracing::{debug, trace};
use wanderworld_core::{scoped_rng, BiomeId, ChunkKey};
use wanderworld_render::{InstanceBuffer, InstanceTransform, RenderScene};
use wanderworld_world::{ChunkFootprint, FootprintVertex};

/// Placement probability per biome, indexed by [`BiomeId`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<BiomeId, f32>", into = "BTreeMap<BiomeId, f32>")]
pub struct BiomeDensities([f32; BiomeId::COUNT]);

impl BiomeDensities {
    /// Probability for `biome`; 0 when not configured.
    pub fn get(&self, biome: BiomeId) -> f32 {
        self.0[biome.index()]
    }

    /// Builder-style setter.
    pub fn with(mut self, biome: BiomeId, density: f32) -> Self {
        self.0[biome.index()] = density;
        self
    }
}

impl From<BTreeMap<BiomeId, f32>> for BiomeDensities {
    fn from(map: BTreeMap<BiomeId, f32>) -> Self {
        map.into_iter()
            .fold(Self::default(), |acc, (biome, density)| acc.with(biome, density))
    }
}

impl From<BiomeDensities> for BTreeMap<BiomeId, f32> {
    fn from(densities: BiomeDensities) -> Self {
        BiomeId::all()
            .iter()
            .filter(|b| densities.get(**b) > 0.0)
            .map(|b| (*b, densities.get(*b)))
            .collect()
    }
}

/// Data description of one decorative entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDescriptor {
    /// Type name; also the render batch name.
    pub name: String,
    /// Pool capacity: simultaneous instances world-wide.
    pub max_instances: usize,
    /// Scale before variance.
    pub base_scale: f32,
    /// `[min, max]` multiplier drawn uniformly per instance.
    pub scale_variance: [f32; 2],
    /// Vertical offset added to the terrain height.
    pub y_offset: f32,
    /// Candidates below this height are skipped.
    pub min_placement_height: f32,
    /// Minimum normal up-component; flatter ground has higher values.
    pub max_placement_slope: f32,
    /// Tilt instances to the terrain normal.
    pub align_to_normal: bool,
    /// Placement probability per sampled grid point, by biome.
    pub density: BiomeDensities,
}

impl Default for EntityDescriptor {
    fn default() -> Self {
        Self {
            name: "entity".to_string(),
            max_instances: 100,
            base_scale: 1.0,
            scale_variance: [1.0, 1.0],
            y_offset: 0.0,
            min_placement_height: f32::MIN,
            max_placement_slope: 0.0,
            align_to_normal: false,
            density: BiomeDensities::default(),
        }
    }
}

impl EntityDescriptor {
    /// Load a JSON list of descriptors.
    pub fn load_list(path: &Path) -> Result<Vec<Self>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read entity descriptors at {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse entity descriptors at {}", path.display()))
    }

    /// Whether a candidate passes the height and slope gates.
    fn accepts(&self, vertex: &FootprintVertex) -> bool {
        vertex.world.y >= self.min_placement_height && vertex.normal.y >= self.max_placement_slope
    }

    /// Random transform for an instance standing on `vertex`.
    fn transform(&self, vertex: &FootprintVertex, rng: &mut impl Rng) -> InstanceTransform {
        let yaw = rng.gen_range(0.0..TAU);
        let rotation = if self.align_to_normal {
            let normal = vertex.normal.try_normalize().unwrap_or(Vec3::Y);
            Quat::from_axis_angle(normal, yaw) * Quat::from_rotation_arc(Vec3::Y, normal)
        } else {
            Quat::from_rotation_y(yaw)
        };

        let [lo, hi] = self.scale_variance;
        let variance = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        let position = vertex.world + Vec3::Y * self.y_offset;

        InstanceTransform::from_trs(position, rotation, self.base_scale * variance)
    }
}

/// Fixed-capacity slot allocator backed by an instance buffer.
///
/// The free stack and the per-chunk occupied lists always partition
/// `0..capacity`.
///
/// Live slots are scattered after frees, so the buffer's draw count is the
/// high-water mark (highest live slot + 1); freed slots below it hold
/// zero-scale transforms.
#[derive(Debug, Clone)]
pub struct InstancePool {
    free: Vec<u32>,
    occupied: HashMap<ChunkKey, Vec<u32>>,
    live: Vec<bool>,
    high_water: usize,
    buffer: InstanceBuffer,
}

impl InstancePool {
    /// Pool with every slot free.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: (0..capacity as u32).rev().collect(),
            occupied: HashMap::new(),
            live: vec![false; capacity],
            high_water: 0,
            buffer: InstanceBuffer::new(capacity),
        }
    }

    /// Total slots.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Slots not owned by any chunk.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Live instances (`capacity - free`).
    pub fn live_count(&self) -> usize {
        self.capacity() - self.free_count()
    }

    /// Slots owned by `key`.
    pub fn slots_for(&self, key: ChunkKey) -> &[u32] {
        self.occupied.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chunks currently owning slots.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.occupied.keys().copied()
    }

    /// Backing instance buffer.
    pub fn buffer(&self) -> &InstanceBuffer {
        &self.buffer
    }

    /// Take a free slot for `key` and write its transform.
    /// Returns `None` when the pool is exhausted.
    pub fn allocate(&mut self, key: ChunkKey, transform: InstanceTransform) -> Option<u32> {
        let slot = self.free.pop()?;
        self.buffer.set(slot as usize, transform);
        self.occupied.entry(key).or_default().push(slot);
        self.live[slot as usize] = true;
        self.high_water = self.high_water.max(slot as usize + 1);
        self.buffer.set_visible(self.high_water);
        Some(slot)
    }

    /// Return every slot owned by `key`, hiding each one.
    /// Unknown keys are a no-op.
    pub fn release_chunk(&mut self, key: ChunkKey) -> usize {
        let Some(slots) = self.occupied.remove(&key) else {
            return 0;
        };
        for &slot in &slots {
            self.buffer.hide(slot as usize);
            self.live[slot as usize] = false;
            self.free.push(slot);
        }
        while self.high_water > 0 && !self.live[self.high_water - 1] {
            self.high_water -= 1;
        }
        self.buffer.set_visible(self.high_water);
        slots.len()
    }

    /// Upload the buffer if it changed.
    pub fn flush<S: RenderScene + ?Sized>(&mut self, batch: &str, scene: &mut S) -> bool {
        if self.buffer.take_dirty() {
            scene.upload_instances(batch, &self.buffer);
            true
        } else {
            false
        }
    }

    /// Check the slot partition: every slot is free or owned by exactly one
    /// chunk, and nothing is both.
    pub fn is_partitioned(&self) -> bool {
        let mut seen = vec![false; self.capacity()];
        let all = self
            .free
            .iter()
            .chain(self.occupied.values().flatten())
            .copied();
        for slot in all {
            match seen.get_mut(slot as usize) {
                Some(flag) if !*flag => *flag = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|flag| flag)
    }
}

struct EntityType {
    descriptor: EntityDescriptor,
    pool: InstancePool,
}

/// Per-type instance pools plus the placement rules that fill them.
pub struct EntityManager {
    types: Vec<EntityType>,
    stride: usize,
    world_seed: u64,
}

impl EntityManager {
    /// Sampling stride used when none is configured.
    pub const DEFAULT_STRIDE: usize = 4;

    /// Build pools for every descriptor.
    pub fn new(descriptors: Vec<EntityDescriptor>, stride: usize, world_seed: u64) -> Self {
        let types = descriptors
            .into_iter()
            .map(|descriptor| EntityType {
                pool: InstancePool::new(descriptor.max_instances),
                descriptor,
            })
            .collect();
        Self {
            types,
            stride: stride.max(1),
            world_seed,
        }
    }

    /// Descriptor and pool per type.
    pub fn pools(&self) -> impl Iterator<Item = (&EntityDescriptor, &InstancePool)> {
        self.types.iter().map(|t| (&t.descriptor, &t.pool))
    }

    /// Pool for a named type.
    pub fn pool(&self, name: &str) -> Option<&InstancePool> {
        self.types
            .iter()
            .find(|t| t.descriptor.name == name)
            .map(|t| &t.pool)
    }

    /// Live instances across all types.
    pub fn live_instances(&self) -> usize {
        self.types.iter().map(|t| t.pool.live_count()).sum()
    }

    /// Scatter instances over a chunk's grid. Returns how many were placed.
    ///
    /// Any slots the chunk already held are released first, so repopulating
    /// a chunk never double-allocates.
    pub fn add_details_for_chunk(&mut self, footprint: ChunkFootprint<'_>) -> usize {
        let key = footprint.key;
        self.remove_details_for_chunk(key);

        let mut rng = scoped_rng(self.world_seed, key.stable_hash());
        let row = footprint.row_len();
        let mut placed = 0;

        for iz in (0..row).step_by(self.stride) {
            for ix in (0..row).step_by(self.stride) {
                let Some(vertex) = footprint.vertex(ix, iz) else {
                    continue;
                };
                let Some(biome) = vertex.biome else {
                    continue;
                };
                for ty in &mut self.types {
                    let density = ty.descriptor.density.get(biome);
                    if density <= 0.0 || !ty.descriptor.accepts(&vertex) {
                        continue;
                    }
                    if rng.gen::<f32>() >= density {
                        continue;
                    }
                    let transform = ty.descriptor.transform(&vertex, &mut rng);
                    if ty.pool.allocate(key, transform).is_some() {
                        placed += 1;
                    } else {
                        trace!(entity = %ty.descriptor.name, chunk = %key, "Instance pool exhausted");
                    }
                }
            }
        }

        debug!(chunk = %key, placed, "Entity details added");
        placed
    }

    /// Free every slot a chunk holds. Idempotent.
    pub fn remove_details_for_chunk(&mut self, key: ChunkKey) -> usize {
        let mut freed = 0;
        for ty in &mut self.types {
            freed += ty.pool.release_chunk(key);
        }
        freed
    }

    /// Release every chunk's slots.
    pub fn clear(&mut self) {
        for ty in &mut self.types {
            let keys: Vec<_> = ty.pool.chunks().collect();
            for key in keys {
                ty.pool.release_chunk(key);
            }
        }
    }

    /// Upload changed instance buffers to the scene.
    pub fn flush<S: RenderScene + ?Sized>(&mut self, scene: &mut S) -> usize {
        let mut uploaded = 0;
        for ty in &mut self.types {
            if ty.pool.flush(&ty.descriptor.name, scene) {
                uploaded += 1;
            }
        }
        uploaded
    }
}
