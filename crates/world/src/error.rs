//! Errors raised by chunk generation.

use thiserror::Error;
use wanderworld_core::ChunkKey;

/// Failure while generating a chunk payload.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    /// The request parameters cannot describe a grid.
    #[error("invalid generation request for chunk {key}: {reason}")]
    InvalidRequest {
        /// Chunk the request was for.
        key: ChunkKey,
        /// What was wrong with it.
        reason: String,
    },
    /// A worker panicked while building a chunk.
    #[error("generation worker panicked on chunk {key}: {message}")]
    WorkerPanicked {
        /// Chunk being built when the worker panicked.
        key: ChunkKey,
        /// Panic payload, if it was a string.
        message: String,
    },
    /// Every worker has exited; no further results will arrive.
    #[error("generation workers disconnected")]
    WorkerDisconnected,
    /// Worker threads could not be started.
    #[error("failed to spawn generation worker: {0}")]
    Spawn(String),
}
