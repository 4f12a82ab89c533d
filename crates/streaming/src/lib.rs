#![warn(missing_docs)]
//! Chunk streaming, entity instancing and the terrain explorer facade.
//!
//! Terrain chunks are generated off the frame thread by a
//! [`GenerationBackend`](wanderworld_world::GenerationBackend) and realized
//! on it by the [`ChunkManager`] under a per-frame work budget. Entity
//! details are scattered over each realized chunk into fixed-capacity
//! instance pools.

mod clouds;
mod config;
mod entities;
mod error;
mod explorer;
pub mod scheduler;
mod store;

pub use clouds::{Cloud, CloudConfig, CloudField, CLOUD_BATCH};
pub use config::StreamingConfig;
pub use entities::{BiomeDensities, EntityDescriptor, EntityManager, InstancePool};
pub use error::StreamingError;
pub use explorer::{ExplorerSettings, PlayerPosition, TerrainExplorer};
pub use scheduler::{ChunkManager, ChunkRequestState, QueueDepths, StreamingStats};
pub use store::{ChunkMaterials, ChunkRecord, ChunkStore};
