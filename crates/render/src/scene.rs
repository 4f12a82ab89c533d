//! Render-scene attach point for streamed geometry.

use crate::instance::InstanceBuffer;
use crate::material::{Material, MaterialId};
use glam::Vec3;
use std::collections::HashMap;
use tracing::{debug, trace};

/// CPU-side mesh ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// `(x, y, z)` triples in mesh-local space.
    pub positions: Vec<f32>,
    /// Unit `(x, y, z)` normals.
    pub normals: Vec<f32>,
    /// `(u, v)` pairs.
    pub uvs: Vec<f32>,
    /// Per-vertex material tag (biome id for terrain).
    pub tags: Vec<u8>,
    /// Triangle list.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat quad in the XZ plane at height `y`, centred on the origin.
    pub fn flat_quad(size: f32, y: f32) -> Self {
        let h = size * 0.5;
        Self {
            positions: vec![-h, y, -h, h, y, -h, -h, y, h, h, y, h],
            normals: [0.0, 1.0, 0.0].repeat(4),
            uvs: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            tags: vec![0; 4],
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }
}

/// Handle to a mesh attached to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Render scene the streaming system attaches geometry to.
pub trait RenderScene {
    /// Register a material for later meshes.
    fn register_material(&mut self, material: Material) -> MaterialId;

    /// Attach a mesh translated to `translation` in world space.
    fn add_mesh(&mut self, mesh: MeshData, material: MaterialId, translation: Vec3) -> MeshHandle;

    /// Detach a mesh and release its geometry. Returns `false` for unknown handles.
    fn remove_mesh(&mut self, handle: MeshHandle) -> bool;

    /// Upload the drawable prefix of an instance buffer for a named batch.
    fn upload_instances(&mut self, batch: &str, buffer: &InstanceBuffer);

    /// Number of attached meshes.
    fn mesh_count(&self) -> usize;
}

/// Mesh attached to a [`SceneGraph`].
#[derive(Debug, Clone)]
pub struct SceneMesh {
    /// Geometry.
    pub mesh: MeshData,
    /// Material used to draw it.
    pub material: MaterialId,
    /// World translation.
    pub translation: Vec3,
}

/// Last upload received for an instance batch.
#[derive(Debug, Clone, Default)]
pub struct InstanceBatch {
    /// Number of instances drawn.
    pub visible: usize,
    /// Bytes of the last upload.
    pub bytes: usize,
    /// Uploads received so far.
    pub uploads: u64,
}

/// In-memory scene graph; the headless stand-in for a GPU scene.
#[derive(Debug, Default)]
pub struct SceneGraph {
    materials: Vec<Material>,
    meshes: HashMap<MeshHandle, SceneMesh>,
    batches: HashMap<String, InstanceBatch>,
    next_handle: u64,
}

impl SceneGraph {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an attached mesh.
    pub fn mesh(&self, handle: MeshHandle) -> Option<&SceneMesh> {
        self.meshes.get(&handle)
    }

    /// Look up a registered material.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    /// Last upload state of a batch.
    pub fn batch(&self, name: &str) -> Option<&InstanceBatch> {
        self.batches.get(name)
    }

    /// Total triangles attached.
    pub fn triangle_count(&self) -> usize {
        self.meshes.values().map(|m| m.mesh.triangle_count()).sum()
    }
}

impl RenderScene for SceneGraph {
    fn register_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        debug!(name = %material.name, fallback = material.is_fallback, "Material registered");
        self.materials.push(material);
        id
    }

    fn add_mesh(&mut self, mesh: MeshData, material: MaterialId, translation: Vec3) -> MeshHandle {
        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.meshes.insert(
            handle,
            SceneMesh {
                mesh,
                material,
                translation,
            },
        );
        handle
    }

    fn remove_mesh(&mut self, handle: MeshHandle) -> bool {
        self.meshes.remove(&handle).is_some()
    }

    fn upload_instances(&mut self, batch: &str, buffer: &InstanceBuffer) {
        let entry = self.batches.entry(batch.to_string()).or_default();
        entry.visible = buffer.visible();
        entry.bytes = buffer.as_bytes().len();
        entry.uploads += 1;
        trace!(batch, visible = entry.visible, "Instance batch uploaded");
    }

    fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
