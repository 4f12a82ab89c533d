//! Realized chunks and the render/physics resources they own.

use glam::Vec3;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use wanderworld_core::ChunkKey;
use wanderworld_physics::{ColliderHandle, PhysicsError, PhysicsWorld};
use wanderworld_render::{MaterialId, MeshData, MeshHandle, RenderScene};
use wanderworld_world::ChunkPayload;

/// Materials chunks are drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMaterials {
    /// Terrain surface.
    pub terrain: MaterialId,
    /// Water overlay.
    pub water: MaterialId,
}

/// One materialized chunk. Owns its mesh, collider and optional water quad.
#[derive(Debug)]
pub struct ChunkRecord {
    payload: Arc<ChunkPayload>,
    mesh: MeshHandle,
    collider: ColliderHandle,
    water: Option<MeshHandle>,
}

impl ChunkRecord {
    /// Build and attach a chunk's resources.
    ///
    /// The collider is built first; if it fails nothing is attached.
    pub fn create<S, P>(
        payload: Arc<ChunkPayload>,
        materials: ChunkMaterials,
        water_level: Option<f32>,
        scene: &mut S,
        physics: &mut P,
    ) -> Result<Self, PhysicsError>
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        let collider = physics.insert_trimesh(&payload.world_vertices, &payload.indices)?;

        let origin = payload.world_origin();
        let mesh = scene.add_mesh(
            MeshData {
                positions: payload.positions.clone(),
                normals: payload.normals.clone(),
                uvs: payload.uvs.clone(),
                tags: payload.biome_ids.clone(),
                indices: payload.indices.clone(),
            },
            materials.terrain,
            origin,
        );

        let water = water_level
            .filter(|&level| payload.min_height < level)
            .map(|level| {
                scene.add_mesh(
                    MeshData::flat_quad(payload.chunk_size as f32, level),
                    materials.water,
                    origin,
                )
            });

        Ok(Self {
            payload,
            mesh,
            collider,
            water,
        })
    }

    /// Detach everything: collider first, then the mesh, then any water.
    pub fn destroy<S, P>(self, scene: &mut S, physics: &mut P)
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        let key = self.payload.key;
        if let Err(err) = physics.remove_collider(self.collider) {
            warn!(chunk = %key, error = %err, "Chunk collider already gone");
        }
        if !scene.remove_mesh(self.mesh) {
            warn!(chunk = %key, "Chunk mesh already detached");
        }
        if let Some(water) = self.water {
            scene.remove_mesh(water);
        }
    }

    /// Chunk key.
    pub fn key(&self) -> ChunkKey {
        self.payload.key
    }

    /// Geometry the chunk was built from.
    pub fn payload(&self) -> &Arc<ChunkPayload> {
        &self.payload
    }

    /// Render mesh handle.
    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    /// Collider handle.
    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    /// Whether a water overlay was created.
    pub fn has_water(&self) -> bool {
        self.water.is_some()
    }

    /// World translation of the chunk mesh.
    pub fn origin(&self) -> Vec3 {
        self.payload.world_origin()
    }
}

/// All realized chunks, keyed by chunk coordinate.
#[derive(Debug)]
pub struct ChunkStore {
    records: HashMap<ChunkKey, ChunkRecord>,
    materials: ChunkMaterials,
    water_level: Option<f32>,
}

impl ChunkStore {
    /// Empty store.
    pub fn new(materials: ChunkMaterials, water_level: Option<f32>) -> Self {
        Self {
            records: HashMap::new(),
            materials,
            water_level,
        }
    }

    /// Materialize a payload. Existing records for the key are left alone.
    pub fn insert<S, P>(
        &mut self,
        payload: Arc<ChunkPayload>,
        scene: &mut S,
        physics: &mut P,
    ) -> Result<&ChunkRecord, PhysicsError>
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        let key = payload.key;
        match self.records.entry(key) {
            Entry::Occupied(existing) => Ok(&*existing.into_mut()),
            Entry::Vacant(slot) => {
                let record =
                    ChunkRecord::create(payload, self.materials, self.water_level, scene, physics)?;
                debug!(chunk = %key, water = record.has_water(), "Chunk materialized");
                Ok(&*slot.insert(record))
            }
        }
    }

    /// Destroy and forget a chunk. Returns `false` if it was not realized.
    pub fn remove<S, P>(&mut self, key: ChunkKey, scene: &mut S, physics: &mut P) -> bool
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        match self.records.remove(&key) {
            Some(record) => {
                record.destroy(scene, physics);
                debug!(chunk = %key, "Chunk destroyed");
                true
            }
            None => false,
        }
    }

    /// Destroy every chunk.
    pub fn clear<S, P>(&mut self, scene: &mut S, physics: &mut P)
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        for (_, record) in self.records.drain() {
            record.destroy(scene, physics);
        }
    }

    /// Whether `key` is realized.
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.records.contains_key(&key)
    }

    /// Record for `key`.
    pub fn get(&self, key: ChunkKey) -> Option<&ChunkRecord> {
        self.records.get(&key)
    }

    /// Realized keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.records.keys().copied()
    }

    /// Number of realized chunks.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no chunks are realized.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
