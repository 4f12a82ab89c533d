//! Chunk geometry: grid sampling, index buffer and smooth normals.
//!
//! [`ChunkMeshBuilder`] turns a [`GenerationRequest`] into a [`ChunkPayload`]
//! of flat buffers. It keeps no state between calls, so one builder can
//! serve every worker thread at once.

use crate::error::GenerationError;
use crate::field::NoiseField;
use glam::Vec3;
use std::sync::Arc;
use tracing::{debug, instrument};
use wanderworld_core::{BiomeId, ChunkKey};

/// Largest grid resolution a request may ask for.
pub const MAX_RESOLUTION: u32 = 1024;

/// Parameters for generating one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationRequest {
    /// Edge length of the chunk in world units.
    pub chunk_size: f64,
    /// Chunk to generate.
    pub key: ChunkKey,
    /// Grid subdivisions per axis.
    pub resolution: u32,
}

impl GenerationRequest {
    /// Create a request.
    pub fn new(key: ChunkKey, chunk_size: f64, resolution: u32) -> Self {
        Self {
            chunk_size,
            key,
            resolution,
        }
    }

    /// Reject requests that cannot describe a grid.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let reason = if !self.chunk_size.is_finite() || self.chunk_size <= 0.0 {
            format!("chunk size {} must be positive and finite", self.chunk_size)
        } else if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            format!(
                "resolution {} outside 1..={}",
                self.resolution, MAX_RESOLUTION
            )
        } else {
            return Ok(());
        };
        Err(GenerationError::InvalidRequest {
            key: self.key,
            reason,
        })
    }

    /// Distance between neighbouring grid vertices.
    pub fn spacing(&self) -> f64 {
        self.chunk_size / self.resolution as f64
    }
}

/// Immutable geometry for one chunk, as returned by a worker.
///
/// Vertex `i` of the `(resolution + 1)²` grid lives at `ix + (resolution + 1) * iz`;
/// three-component buffers store it at `3 * i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayload {
    /// Chunk this payload belongs to.
    pub key: ChunkKey,
    /// Edge length in world units.
    pub chunk_size: f64,
    /// Grid subdivisions per axis.
    pub resolution: u32,
    /// Chunk-local `(x, height, z)` triples, centred on the chunk origin.
    pub positions: Vec<f32>,
    /// Triangle list, two triangles per grid quad.
    pub indices: Vec<u32>,
    /// Absolute world-space `(x, height, z)` triples for collision.
    pub world_vertices: Vec<f32>,
    /// `(u, v)` pairs in [0, 1].
    pub uvs: Vec<f32>,
    /// Unit vertex normals.
    pub normals: Vec<f32>,
    /// Per-vertex [`BiomeId`] discriminants.
    pub biome_ids: Vec<u8>,
    /// Lowest sampled height.
    pub min_height: f32,
    /// Highest sampled height.
    pub max_height: f32,
}

impl ChunkPayload {
    /// Number of vertices along one grid edge.
    pub fn row_len(&self) -> usize {
        self.resolution as usize + 1
    }

    /// Total vertex count.
    pub fn vertex_count(&self) -> usize {
        self.biome_ids.len()
    }

    /// World translation applied to the chunk-local mesh.
    pub fn world_origin(&self) -> Vec3 {
        let (x, z) = self.key.world_offset(self.chunk_size);
        Vec3::new(x as f32, 0.0, z as f32)
    }

    /// The subset of buffers entity placement reads.
    pub fn footprint(&self) -> ChunkFootprint<'_> {
        ChunkFootprint {
            key: self.key,
            chunk_size: self.chunk_size,
            resolution: self.resolution,
            positions: &self.positions,
            normals: &self.normals,
            biome_ids: &self.biome_ids,
        }
    }
}

/// Borrowed view of a payload's grid data for entity placement.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFootprint<'a> {
    /// Chunk the data belongs to.
    pub key: ChunkKey,
    /// Edge length in world units.
    pub chunk_size: f64,
    /// Grid subdivisions per axis.
    pub resolution: u32,
    /// Chunk-local positions.
    pub positions: &'a [f32],
    /// Vertex normals.
    pub normals: &'a [f32],
    /// Per-vertex biome ids.
    pub biome_ids: &'a [u8],
}

/// One grid vertex as seen by entity placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintVertex {
    /// World-space position.
    pub world: Vec3,
    /// Unit normal.
    pub normal: Vec3,
    /// Biome, if the stored id was valid.
    pub biome: Option<BiomeId>,
}

impl ChunkFootprint<'_> {
    /// Number of vertices along one grid edge.
    pub fn row_len(&self) -> usize {
        self.resolution as usize + 1
    }

    /// Vertex at grid coordinates, or `None` outside the grid or buffers.
    pub fn vertex(&self, ix: usize, iz: usize) -> Option<FootprintVertex> {
        let row = self.row_len();
        if ix >= row || iz >= row {
            return None;
        }
        let i = ix + row * iz;
        let p = self.positions.get(3 * i..3 * i + 3)?;
        let n = self.normals.get(3 * i..3 * i + 3)?;
        let biome = self.biome_ids.get(i).copied().and_then(BiomeId::from_u8);

        let (ox, oz) = self.key.world_offset(self.chunk_size);
        Some(FootprintVertex {
            world: Vec3::new(p[0] + ox as f32, p[1], p[2] + oz as f32),
            normal: Vec3::new(n[0], n[1], n[2]),
            biome,
        })
    }
}

/// Produces chunk payloads. Implementations must be stateless across calls.
pub trait ChunkGenerator: Send + Sync {
    /// Build the payload described by `request`.
    fn generate(&self, request: &GenerationRequest) -> Result<ChunkPayload, GenerationError>;
}

/// Samples a [`NoiseField`] over a chunk grid and builds its mesh buffers.
#[derive(Clone)]
pub struct ChunkMeshBuilder {
    field: Arc<NoiseField>,
}

impl ChunkMeshBuilder {
    /// Create a builder over a shared field.
    pub fn new(field: Arc<NoiseField>) -> Self {
        Self { field }
    }

    /// The field this builder samples.
    pub fn field(&self) -> &Arc<NoiseField> {
        &self.field
    }

    /// Generate a chunk's payload.
    #[instrument(skip(self), fields(chunk = %request.key, resolution = request.resolution))]
    pub fn build(&self, request: &GenerationRequest) -> Result<ChunkPayload, GenerationError> {
        request.validate()?;

        let n = request.resolution as usize;
        let row = n + 1;
        let vertex_count = row * row;
        let size = request.chunk_size;
        let (origin_x, origin_z) = request.key.world_offset(size);

        let mut positions = Vec::with_capacity(vertex_count * 3);
        let mut world_vertices = Vec::with_capacity(vertex_count * 3);
        let mut uvs = Vec::with_capacity(vertex_count * 2);
        let mut biome_ids = Vec::with_capacity(vertex_count);
        let mut min_height = f32::INFINITY;
        let mut max_height = f32::NEG_INFINITY;

        for iz in 0..row {
            let v = iz as f64 / n as f64;
            let local_z = (v - 0.5) * size;
            for ix in 0..row {
                let u = ix as f64 / n as f64;
                let local_x = (u - 0.5) * size;
                let world_x = local_x + origin_x;
                let world_z = local_z + origin_z;

                let sample = self.field.sample(world_x, world_z);
                let height = sample.height as f32;
                min_height = min_height.min(height);
                max_height = max_height.max(height);

                positions.extend_from_slice(&[local_x as f32, height, local_z as f32]);
                world_vertices.extend_from_slice(&[world_x as f32, height, world_z as f32]);
                uvs.extend_from_slice(&[u as f32, v as f32]);
                biome_ids.push(sample.biome.as_u8());
            }
        }

        let indices = grid_indices(request.resolution);
        let normals = vertex_normals(&positions, &indices);

        debug!(min_height, max_height, "Chunk geometry built");

        Ok(ChunkPayload {
            key: request.key,
            chunk_size: size,
            resolution: request.resolution,
            positions,
            indices,
            world_vertices,
            uvs,
            normals,
            biome_ids,
            min_height,
            max_height,
        })
    }
}

impl ChunkGenerator for ChunkMeshBuilder {
    fn generate(&self, request: &GenerationRequest) -> Result<ChunkPayload, GenerationError> {
        self.build(request)
    }
}

/// Two triangles per quad over an `(n + 1)²` vertex grid.
pub fn grid_indices(resolution: u32) -> Vec<u32> {
    let n = resolution;
    let row = n + 1;
    let mut indices = Vec::with_capacity((n * n * 6) as usize);
    for iz in 0..n {
        for ix in 0..n {
            let a = ix + row * iz;
            let b = ix + row * (iz + 1);
            let c = (ix + 1) + row * (iz + 1);
            let d = (ix + 1) + row * iz;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    indices
}

/// Area-weighted smooth normals.
///
/// Each triangle's unnormalised face normal is added to its three vertices;
/// accumulators are normalised at the end. Degenerate accumulators become +Y.
pub fn vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut accum = vec![Vec3::ZERO; vertex_count];
    let at = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(positions[i], positions[i + 1], positions[i + 2])
    };

    for tri in indices.chunks_exact(3) {
        if tri.iter().any(|&i| i as usize >= vertex_count) {
            continue;
        }
        let (a, b, c) = (at(tri[0]), at(tri[1]), at(tri[2]));
        let face = (c - b).cross(a - b);
        for &i in tri {
            accum[i as usize] += face;
        }
    }

    let mut normals = Vec::with_capacity(vertex_count * 3);
    for n in accum {
        let unit = n.try_normalize().unwrap_or(Vec3::Y);
        normals.extend_from_slice(&unit.to_array());
    }
    normals
}
