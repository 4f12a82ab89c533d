//! Chunk streaming around the player.
//!
//! [`ChunkManager`] decides which chunks should exist, dispatches generation
//! for missing ones, and spreads the expensive parts (materializing and
//! tearing down chunks) over frames. Per chunk key the lifecycle is
//! `NotRequested -> Pending -> Ready -> Materialized`; dropping a key from
//! the pending set cancels it and any late result for it is discarded.

use crate::config::StreamingConfig;
use crate::entities::EntityManager;
use crate::error::StreamingError;
use crate::store::ChunkStore;
use glam::Vec3;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};
use wanderworld_core::ChunkKey;
use wanderworld_physics::PhysicsWorld;
use wanderworld_render::RenderScene;
use wanderworld_world::{
    ChunkPayload, GenerationBackend, GenerationError, GenerationOutcome, GenerationRequest,
};

/// Where a chunk key is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRequestState {
    /// Not wanted or not yet asked for.
    NotRequested,
    /// Dispatched to a worker, no result yet.
    Pending,
    /// Result received, waiting for a materialization slot.
    Ready,
    /// Realized in the chunk store.
    Materialized,
}

/// Running counters for one streaming session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamingStats {
    /// Generation requests dispatched.
    pub requested: u64,
    /// Chunks materialized.
    pub materialized: u64,
    /// Chunks destroyed.
    pub destroyed: u64,
    /// Pending or ready chunks cancelled because the player moved away.
    pub cancelled: u64,
    /// Results dropped because their key was no longer pending.
    pub discarded_late: u64,
    /// Chunks pulled back out of the destruction queue.
    pub rescued: u64,
    /// Chunks skipped because their collider could not be built.
    pub failed: u64,
    /// Generation faults observed.
    pub faults: u64,
}

/// Queue sizes at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepths {
    /// Keys awaiting a result or a materialization slot.
    pub pending: usize,
    /// Results waiting to be materialized.
    pub ready: usize,
    /// Realized chunks waiting to be destroyed.
    pub destruction: usize,
    /// Realized chunks.
    pub realized: usize,
}

/// Streaming scheduler for terrain chunks.
pub struct ChunkManager {
    config: StreamingConfig,
    backend: Box<dyn GenerationBackend>,
    store: ChunkStore,
    entities: EntityManager,
    /// Square of offsets around the player chunk, nearest first.
    offsets: Vec<(i32, i32)>,
    pending: HashSet<ChunkKey>,
    ready: VecDeque<Arc<ChunkPayload>>,
    destruction: VecDeque<ChunkKey>,
    last_player_chunk: Option<ChunkKey>,
    fault: Option<GenerationError>,
    stats: StreamingStats,
}

impl ChunkManager {
    /// Create a scheduler over a generation backend.
    pub fn new(
        config: StreamingConfig,
        backend: Box<dyn GenerationBackend>,
        store: ChunkStore,
        entities: EntityManager,
    ) -> Result<Self, StreamingError> {
        config.validate()?;
        let offsets = square_offsets(config.render_distance as i32);
        Ok(Self {
            config,
            backend,
            store,
            entities,
            offsets,
            pending: HashSet::new(),
            ready: VecDeque::new(),
            destruction: VecDeque::new(),
            last_player_chunk: None,
            fault: None,
            stats: StreamingStats::default(),
        })
    }

    /// Chunk containing a world position.
    pub fn chunk_key(&self, x: f64, z: f64) -> ChunkKey {
        ChunkKey::from_world(x, z, self.config.chunk_size)
    }

    /// Keys that should exist around `center`.
    pub fn needed_chunks(&self, center: ChunkKey) -> HashSet<ChunkKey> {
        self.offsets
            .iter()
            .map(|&(dx, dz)| center.offset(dx, dz))
            .collect()
    }

    /// One frame of streaming: collect results, update the needed set, and
    /// do a bounded amount of materialization and destruction.
    pub fn update<S, P>(&mut self, player: Vec3, scene: &mut S, physics: &mut P)
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        self.poll_results();
        self.check_for_needed_chunks(player, false);
        self.process_queues(scene, physics);
        self.entities.flush(scene);
    }

    /// Drain every finished generation outcome from the backend.
    pub fn poll_results(&mut self) {
        loop {
            match self.backend.poll() {
                Ok(Some(outcome)) => self.accept(outcome),
                Ok(None) => break,
                Err(err) => {
                    self.halt(err);
                    break;
                }
            }
        }
    }

    fn accept(&mut self, outcome: GenerationOutcome) {
        let key = outcome.key;
        match outcome.result {
            Ok(payload) if self.fault.is_none() && self.pending.contains(&key) => {
                trace!(chunk = %key, "Chunk data ready");
                self.ready.push_back(Arc::new(payload));
            }
            Ok(_) => {
                trace!(chunk = %key, "Discarding stale chunk result");
                self.stats.discarded_late += 1;
            }
            Err(err) => self.halt(err),
        }
    }

    /// Recompute the needed set and reconcile requests, evictions and
    /// cancellations with it.
    ///
    /// Does nothing if the player is still in the chunk seen last time,
    /// unless `force` is set.
    #[instrument(skip(self), fields(x = player.x, z = player.z))]
    pub fn check_for_needed_chunks(&mut self, player: Vec3, force: bool) {
        if self.fault.is_some() {
            return;
        }
        let center = self.chunk_key(f64::from(player.x), f64::from(player.z));
        if !force && self.last_player_chunk == Some(center) {
            return;
        }
        self.last_player_chunk = Some(center);

        // Nearest first, so the ground under the player arrives early.
        let order: Vec<ChunkKey> = self
            .offsets
            .iter()
            .map(|&(dx, dz)| center.offset(dx, dz))
            .collect();
        let needed: HashSet<ChunkKey> = order.iter().copied().collect();

        for key in order {
            if self.store.contains(key) {
                if let Some(pos) = self.destruction.iter().position(|k| *k == key) {
                    self.destruction.remove(pos);
                    self.rescue(key);
                }
                continue;
            }
            if self.pending.contains(&key) || self.fault.is_some() {
                continue;
            }
            let request = GenerationRequest::new(key, self.config.chunk_size, self.config.resolution);
            if let Err(err) = self.backend.submit(request) {
                self.halt(err);
                continue;
            }
            self.pending.insert(key);
            self.stats.requested += 1;
        }

        let stale: Vec<ChunkKey> = self
            .store
            .keys()
            .filter(|key| !needed.contains(key) && !self.destruction.contains(key))
            .collect();
        for key in stale {
            // Instance slots are freed now; mesh and collider go later.
            self.entities.remove_details_for_chunk(key);
            self.destruction.push_back(key);
        }

        let before = self.pending.len();
        self.pending.retain(|key| needed.contains(key));
        self.ready.retain(|payload| needed.contains(&payload.key));
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            debug!(cancelled, "Cancelled chunk requests");
            self.stats.cancelled += cancelled as u64;
        }
    }

    fn rescue(&mut self, key: ChunkKey) {
        if let Some(record) = self.store.get(key) {
            let payload = Arc::clone(record.payload());
            self.entities.add_details_for_chunk(payload.footprint());
            self.stats.rescued += 1;
            debug!(chunk = %key, "Chunk rescued from destruction queue");
        }
    }

    /// Materialize at most `max_chunks_per_frame` ready chunks, then destroy
    /// at most `max_chunks_per_frame` stale ones.
    pub fn process_queues<S, P>(&mut self, scene: &mut S, physics: &mut P)
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        let budget = self.config.max_chunks_per_frame;

        let mut built = 0;
        while built < budget {
            let Some(payload) = self.ready.pop_front() else {
                break;
            };
            let key = payload.key;
            if !self.pending.remove(&key) {
                self.stats.discarded_late += 1;
                continue;
            }
            if self.store.contains(key) || self.destruction.contains(&key) {
                continue;
            }
            built += 1;
            match self.store.insert(Arc::clone(&payload), scene, physics) {
                Ok(_) => {
                    self.entities.add_details_for_chunk(payload.footprint());
                    self.stats.materialized += 1;
                }
                Err(source) => {
                    let err = StreamingError::Materialize { key, source };
                    warn!(error = %err, "Skipping chunk");
                    self.stats.failed += 1;
                }
            }
        }

        for _ in 0..budget {
            let Some(key) = self.destruction.pop_front() else {
                break;
            };
            if self.store.remove(key, scene, physics) {
                self.stats.destroyed += 1;
            }
        }
    }

    fn halt(&mut self, err: GenerationError) {
        self.stats.faults += 1;
        if self.fault.is_none() {
            error!(error = %err, "Chunk generation failed; halting streaming");
            self.fault = Some(err);
        }
        self.pending.clear();
        self.ready.clear();
    }

    /// Tear everything down: chunks (collider first), entity slots, queues
    /// and the generation backend.
    pub fn dispose<S, P>(&mut self, scene: &mut S, physics: &mut P)
    where
        S: RenderScene + ?Sized,
        P: PhysicsWorld + ?Sized,
    {
        info!(realized = self.store.len(), "Disposing chunk manager");
        self.entities.clear();
        self.entities.flush(scene);
        self.store.clear(scene, physics);
        self.pending.clear();
        self.ready.clear();
        self.destruction.clear();
        self.last_player_chunk = None;
        self.backend.shutdown();
    }

    /// Lifecycle state of a key.
    pub fn state(&self, key: ChunkKey) -> ChunkRequestState {
        if self.store.contains(key) {
            ChunkRequestState::Materialized
        } else if self.ready.iter().any(|p| p.key == key) {
            ChunkRequestState::Ready
        } else if self.pending.contains(&key) {
            ChunkRequestState::Pending
        } else {
            ChunkRequestState::NotRequested
        }
    }

    /// Whether a generation fault stopped new requests.
    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }

    /// The fault that halted streaming, if any.
    pub fn fault(&self) -> Option<&GenerationError> {
        self.fault.as_ref()
    }

    /// Counters since creation.
    pub fn stats(&self) -> StreamingStats {
        self.stats
    }

    /// Current queue sizes.
    pub fn queue_depths(&self) -> QueueDepths {
        QueueDepths {
            pending: self.pending.len(),
            ready: self.ready.len(),
            destruction: self.destruction.len(),
            realized: self.store.len(),
        }
    }

    /// Whether nothing is pending, ready or awaiting destruction.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty() && self.destruction.is_empty()
    }

    /// Realized chunks.
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Entity pools.
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Streaming configuration.
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }
}

/// Offsets covering the `(2r + 1)²` square, nearest first.
fn square_offsets(radius: i32) -> Vec<(i32, i32)> {
    let mut offsets: Vec<(i32, i32)> = (-radius..=radius)
        .flat_map(|dz| (-radius..=radius).map(move |dx| (dx, dz)))
        .collect();
    offsets.sort_by_key(|&(dx, dz)| (dx.abs().max(dz.abs()), dx * dx + dz * dz, dz, dx));
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_cover_square_nearest_first() {
        let offsets = square_offsets(2);
        assert_eq!(offsets.len(), 25);
        assert_eq!(offsets[0], (0, 0));
        assert!(offsets[1..9]
            .iter()
            .all(|&(dx, dz)| dx.abs().max(dz.abs()) == 1));
        let unique: HashSet<_> = offsets.iter().collect();
        assert_eq!(unique.len(), 25);
    }

    #[test]
    fn zero_radius_is_single_chunk() {
        assert_eq!(square_offsets(0), vec![(0, 0)]);
    }
}
