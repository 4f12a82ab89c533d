//! Errors surfaced by the streaming layer.

use thiserror::Error;
use wanderworld_core::ChunkKey;
use wanderworld_physics::PhysicsError;
use wanderworld_world::GenerationError;

/// Failure in terrain streaming.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StreamingError {
    /// `update` was called before `initialize`.
    #[error("terrain explorer is not initialized")]
    NotInitialized,
    /// A generation fault stopped streaming; realized chunks are untouched.
    #[error("streaming halted: {0}")]
    Halted(GenerationError),
    /// The generation backend could not be created.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// A chunk's collider could not be built.
    #[error("failed to materialize chunk {key}: {source}")]
    Materialize {
        /// Chunk that was skipped.
        key: ChunkKey,
        /// Underlying physics error.
        #[source]
        source: PhysicsError,
    },
    /// Configuration values cannot drive streaming.
    #[error("invalid streaming config: {0}")]
    Config(String),
}
