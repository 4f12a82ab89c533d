//! Streaming configuration.

use crate::error::StreamingError;
use serde::{Deserialize, Serialize};
use wanderworld_world::MAX_RESOLUTION;

/// Chunk streaming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Edge length of a chunk in world units.
    pub chunk_size: f64,
    /// Grid subdivisions per chunk axis.
    pub resolution: u32,
    /// Chunks kept on each side of the player's chunk.
    pub render_distance: u32,
    /// Chunks materialized, and separately destroyed, per frame at most.
    pub max_chunks_per_frame: usize,
    /// Generation worker threads.
    pub worker_threads: usize,
    /// Chunks dipping below this height get a water overlay.
    /// `None` disables overlays.
    pub water_level: Option<f32>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 128.0,
            resolution: 64,
            render_distance: 2,
            max_chunks_per_frame: 2,
            worker_threads: 2,
            water_level: Some(-6.0),
        }
    }
}

impl StreamingConfig {
    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), StreamingError> {
        if !self.chunk_size.is_finite() || self.chunk_size <= 0.0 {
            return Err(StreamingError::Config(format!(
                "chunk_size must be positive, got {}",
                self.chunk_size
            )));
        }
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(StreamingError::Config(format!(
                "resolution must be in 1..={MAX_RESOLUTION}, got {}",
                self.resolution
            )));
        }
        if self.max_chunks_per_frame == 0 {
            return Err(StreamingError::Config(
                "max_chunks_per_frame must be at least 1".to_string(),
            ));
        }
        if self.render_distance > 64 {
            return Err(StreamingError::Config(format!(
                "render_distance {} is unreasonably large",
                self.render_distance
            )));
        }
        Ok(())
    }

    /// Number of chunks in the needed square.
    pub fn needed_chunk_count(&self) -> usize {
        let side = 2 * self.render_distance as usize + 1;
        side * side
    }
}
