#![warn(missing_docs)]
//! Deterministic testing surfaces: hand-driven generation backend, scripted
//! player, mesh hashing and JSON metric sinks.

mod backend;
mod metrics;
mod player;

use anyhow::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use wanderworld_world::ChunkPayload;

pub use backend::{ManualBackend, ManualHandle};
pub use metrics::*;
pub use player::WalkingPlayer;

/// Mesh metric snapshot for a chunk.
#[derive(Debug, Serialize)]
pub struct ChunkMeshMetric {
    /// Chunk coordinates [x, z].
    pub chunk: [i32; 2],
    /// Triangle count for the chunk mesh.
    pub triangles: usize,
    /// Payload hash (hex string) for deterministic comparisons.
    pub hash: String,
}

impl ChunkMeshMetric {
    /// Summarize a generated payload.
    pub fn from_payload(payload: &ChunkPayload) -> Self {
        Self {
            chunk: [payload.key.x, payload.key.z],
            triangles: payload.indices.len() / 3,
            hash: payload_hash(payload),
        }
    }
}

/// blake3 over every buffer of a payload, as hex.
///
/// Two payloads hash equal only if they are bit-identical. Determinism tests
/// compare chunks from separate runs by this hash.
pub fn payload_hash(payload: &ChunkPayload) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&payload.key.x.to_le_bytes());
    hasher.update(&payload.key.z.to_le_bytes());
    hasher.update(&payload.resolution.to_le_bytes());
    hasher.update(bytemuck::cast_slice(&payload.positions));
    hasher.update(bytemuck::cast_slice(&payload.indices));
    hasher.update(bytemuck::cast_slice(&payload.world_vertices));
    hasher.update(bytemuck::cast_slice(&payload.uvs));
    hasher.update(bytemuck::cast_slice(&payload.normals));
    hasher.update(&payload.biome_ids);
    hasher.finalize().to_hex().to_string()
}

/// Writes chunk mesh metrics to JSON for CI artifacts.
pub struct MeshMetricSink {
    file: File,
}

impl MeshMetricSink {
    /// Create a sink pointed at the supplied path, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Persist the provided metrics as pretty JSON.
    pub fn write(&mut self, metrics: &[ChunkMeshMetric]) -> Result<()> {
        let json = serde_json::to_string_pretty(metrics)?;
        self.file.write_all(json.as_bytes())?;
        Ok(())
    }
}
