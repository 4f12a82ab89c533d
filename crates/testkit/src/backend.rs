//! A generation backend whose results are delivered by hand.
//!
//! Scheduler tests use it to control exactly when and in which order chunk
//! results arrive, including results for keys that were cancelled meanwhile.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wanderworld_core::ChunkKey;
use wanderworld_world::{
    ChunkGenerator, GenerationBackend, GenerationError, GenerationOutcome, GenerationRequest,
};

#[derive(Default)]
struct Shared {
    history: Vec<GenerationRequest>,
    outstanding: Vec<GenerationRequest>,
    outbox: VecDeque<GenerationOutcome>,
    disconnected: bool,
    shut_down: bool,
}

/// Backend half, handed to the scheduler.
pub struct ManualBackend {
    shared: Arc<Mutex<Shared>>,
}

/// Test half, used to inspect requests and push results.
#[derive(Clone)]
pub struct ManualHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ManualBackend {
    /// Create a connected backend/handle pair.
    pub fn new() -> (Self, ManualHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualHandle { shared },
        )
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GenerationBackend for ManualBackend {
    fn submit(&mut self, request: GenerationRequest) -> Result<(), GenerationError> {
        let mut shared = lock(&self.shared);
        if shared.disconnected || shared.shut_down {
            return Err(GenerationError::WorkerDisconnected);
        }
        shared.history.push(request);
        shared.outstanding.push(request);
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<GenerationOutcome>, GenerationError> {
        let mut shared = lock(&self.shared);
        match shared.outbox.pop_front() {
            Some(outcome) => Ok(Some(outcome)),
            None if shared.disconnected => Err(GenerationError::WorkerDisconnected),
            None => Ok(None),
        }
    }

    fn shutdown(&mut self) {
        lock(&self.shared).shut_down = true;
    }
}

impl ManualHandle {
    /// Every request ever submitted, in submission order.
    pub fn submitted(&self) -> Vec<GenerationRequest> {
        lock(&self.shared).history.clone()
    }

    /// Keys of every request ever submitted.
    pub fn submitted_keys(&self) -> Vec<ChunkKey> {
        lock(&self.shared).history.iter().map(|r| r.key).collect()
    }

    /// How many times `key` was requested.
    pub fn times_requested(&self, key: ChunkKey) -> usize {
        lock(&self.shared)
            .history
            .iter()
            .filter(|r| r.key == key)
            .count()
    }

    /// Keys submitted but not answered yet.
    pub fn outstanding_keys(&self) -> Vec<ChunkKey> {
        lock(&self.shared).outstanding.iter().map(|r| r.key).collect()
    }

    /// Answer the outstanding request for `key` with `generator`'s output.
    /// Returns `false` if no request for `key` is outstanding.
    pub fn complete(&self, generator: &dyn ChunkGenerator, key: ChunkKey) -> bool {
        let request = {
            let mut shared = lock(&self.shared);
            let Some(pos) = shared.outstanding.iter().position(|r| r.key == key) else {
                return false;
            };
            shared.outstanding.remove(pos)
        };
        let result = generator.generate(&request);
        lock(&self.shared)
            .outbox
            .push_back(GenerationOutcome { key, result });
        true
    }

    /// Answer every outstanding request. Returns how many were answered.
    pub fn complete_all(&self, generator: &dyn ChunkGenerator) -> usize {
        let keys = self.outstanding_keys();
        keys.into_iter()
            .filter(|&key| self.complete(generator, key))
            .count()
    }

    /// Push an arbitrary outcome, whether or not it was requested.
    pub fn deliver(&self, outcome: GenerationOutcome) {
        let mut shared = lock(&self.shared);
        shared.outstanding.retain(|r| r.key != outcome.key);
        shared.outbox.push_back(outcome);
    }

    /// Report a worker failure for `key`.
    pub fn fail(&self, key: ChunkKey, error: GenerationError) {
        self.deliver(GenerationOutcome {
            key,
            result: Err(error),
        });
    }

    /// Drop the worker side: once queued outcomes drain, polling errors.
    pub fn disconnect(&self) {
        lock(&self.shared).disconnected = true;
    }

    /// Whether the scheduler shut the backend down.
    pub fn is_shut_down(&self) -> bool {
        lock(&self.shared).shut_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wanderworld_world::{ChunkMeshBuilder, NoiseField};

    fn request(x: i32, z: i32) -> GenerationRequest {
        GenerationRequest::new(ChunkKey::new(x, z), 32.0, 4)
    }

    #[test]
    fn results_arrive_only_when_completed() {
        let (mut backend, handle) = ManualBackend::new();
        let builder = ChunkMeshBuilder::new(Arc::new(NoiseField::with_seed(1)));
        backend.submit(request(0, 0)).unwrap();
        backend.submit(request(1, 0)).unwrap();
        assert!(backend.poll().unwrap().is_none());

        assert!(handle.complete(&builder, ChunkKey::new(1, 0)));
        let outcome = backend.poll().unwrap().unwrap();
        assert_eq!(outcome.key, ChunkKey::new(1, 0));
        assert!(outcome.result.is_ok());
        assert_eq!(handle.outstanding_keys(), vec![ChunkKey::new(0, 0)]);
        assert!(!handle.complete(&builder, ChunkKey::new(1, 0)));
    }

    #[test]
    fn disconnect_errors_after_draining() {
        let (mut backend, handle) = ManualBackend::new();
        handle.fail(ChunkKey::new(0, 0), GenerationError::WorkerDisconnected);
        handle.disconnect();
        assert!(backend.poll().unwrap().is_some());
        assert_eq!(
            backend.poll().unwrap_err(),
            GenerationError::WorkerDisconnected
        );
        assert!(backend.submit(request(0, 0)).is_err());
    }
}
