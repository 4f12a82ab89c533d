//! Background chunk generation.
//!
//! Requests go in over one channel and outcomes come back over another; the
//! caller never blocks on a result. Workers share nothing mutable with the
//! caller beyond the channels themselves.

use crate::error::GenerationError;
use crate::mesh::{ChunkGenerator, ChunkPayload, GenerationRequest};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};
use wanderworld_core::ChunkKey;

/// Result of one generation request.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Chunk the request was for.
    pub key: ChunkKey,
    /// Payload, or why it could not be built.
    pub result: Result<ChunkPayload, GenerationError>,
}

/// Where the streaming scheduler sends requests and collects results.
pub trait GenerationBackend: Send {
    /// Queue a request. Never blocks on generation.
    fn submit(&mut self, request: GenerationRequest) -> Result<(), GenerationError>;

    /// Next finished outcome, if any. Results may arrive in any order.
    ///
    /// `Err` means the backend itself is gone and will never deliver again.
    fn poll(&mut self) -> Result<Option<GenerationOutcome>, GenerationError>;

    /// Stop accepting work and release worker resources.
    fn shutdown(&mut self) {}
}

/// Fixed pool of named worker threads running a [`ChunkGenerator`].
pub struct GenerationPool {
    jobs: Option<Sender<GenerationRequest>>,
    results: Receiver<GenerationOutcome>,
    workers: Vec<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl GenerationPool {
    /// Spawn `threads` workers (at least one) sharing `generator`.
    pub fn spawn(
        generator: Arc<dyn ChunkGenerator>,
        threads: usize,
    ) -> Result<Self, GenerationError> {
        let (job_tx, job_rx) = unbounded::<GenerationRequest>();
        let (result_tx, result_rx) = unbounded::<GenerationOutcome>();
        let stop = Arc::new(AtomicBool::new(false));
        let threads = threads.max(1);

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let generator = Arc::clone(&generator);
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let stop = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("chunk-gen-{index}"))
                .spawn(move || worker_loop(generator.as_ref(), &jobs, &results, &stop))
                .map_err(|err| GenerationError::Spawn(err.to_string()))?;
            workers.push(handle);
        }

        info!(threads, "Generation pool started");

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            workers,
            stop,
        })
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Block up to `timeout` for the next outcome.
    pub fn wait(&mut self, timeout: Duration) -> Result<Option<GenerationOutcome>, GenerationError> {
        match self.results.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(GenerationError::WorkerDisconnected),
        }
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Dropping the only sender ends every worker's recv loop.
        self.jobs = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Generation worker exited abnormally");
            }
        }
    }
}

impl GenerationBackend for GenerationPool {
    fn submit(&mut self, request: GenerationRequest) -> Result<(), GenerationError> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or(GenerationError::WorkerDisconnected)?;
        jobs.send(request)
            .map_err(|_| GenerationError::WorkerDisconnected)
    }

    fn poll(&mut self) -> Result<Option<GenerationOutcome>, GenerationError> {
        match self.results.try_recv() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(GenerationError::WorkerDisconnected),
        }
    }

    fn shutdown(&mut self) {
        if !self.workers.is_empty() {
            debug!(workers = self.workers.len(), "Shutting down generation pool");
            self.stop_and_join();
        }
    }
}

impl Drop for GenerationPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    generator: &dyn ChunkGenerator,
    jobs: &Receiver<GenerationRequest>,
    results: &Sender<GenerationOutcome>,
    stop: &AtomicBool,
) {
    while let Ok(request) = jobs.recv() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let key = request.key;
        let result = panic::catch_unwind(AssertUnwindSafe(|| generator.generate(&request)))
            .unwrap_or_else(|payload| {
                Err(GenerationError::WorkerPanicked {
                    key,
                    message: panic_message(payload.as_ref()),
                })
            });
        if results.send(GenerationOutcome { key, result }).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
