#![warn(missing_docs)]
//! Rendering collaborators for streamed terrain: scene attach point,
//! materials, and instance buffers.

mod instance;
mod material;
mod scene;

pub use instance::{InstanceBuffer, InstanceTransform};
pub use material::{AssetError, Material, MaterialId, Texture};
pub use scene::{InstanceBatch, MeshData, MeshHandle, RenderScene, SceneGraph, SceneMesh};
