//! Background chunk updates with a bounded worker pool
//!
//! Chunks that need generating, relighting or a new mesh are handed to worker
//! threads through a crossbeam channel. A chunk is only admitted while fewer
//! chunks than workers are in flight, so every chunk has at most one worker
//! mutating it. Finished chunks wait in a priority queue, nearest to the
//! focus first, until the main thread drains them with
//! [`WorldUpdateManager::update_vbos`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use glam::IVec3;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use tracing::{debug, error, info, trace};

use crate::core::chunk::Chunk;
use crate::world::context::WorldContext;
use crate::world::generator::{ChunkGenerator, FlatGenerator, TerrainGenerator};
use crate::world::lighting::generate_internal_lighting;

/// A chunk shared between the main thread and the update workers.
pub type SharedChunk = Arc<RwLock<Chunk>>;

/// Work done on a chunk by an update worker.
pub trait ChunkProcessor: Send + Sync + 'static {
    /// Brings the chunk up to date. Returns `true` when its mesh has to be
    /// rebuilt.
    fn process_chunk(&self, chunk: &mut Chunk) -> bool;
}

/// Generates fresh chunks, lights them and reports mesh invalidation.
pub struct ChunkPipeline {
    ctx: Arc<WorldContext>,
    generator: Box<dyn ChunkGenerator>,
}

impl ChunkPipeline {
    pub fn new(ctx: Arc<WorldContext>, generator: Box<dyn ChunkGenerator>) -> Self {
        ChunkPipeline { ctx, generator }
    }

    /// Pipeline using the generator selected in the world settings.
    pub fn from_settings(ctx: Arc<WorldContext>) -> Self {
        let generator: Box<dyn ChunkGenerator> = if ctx.settings().world.flat {
            Box::new(FlatGenerator::new(ctx.clone()))
        } else {
            Box::new(TerrainGenerator::new(ctx.clone()))
        };
        Self::new(ctx, generator)
    }
}

impl ChunkProcessor for ChunkPipeline {
    fn process_chunk(&self, chunk: &mut Chunk) -> bool {
        if chunk.is_fresh() {
            self.generator.generate_chunk(chunk);
            chunk.mark_generated();
        }
        if chunk.is_light_dirty() {
            generate_internal_lighting(chunk, &self.ctx);
        }
        if chunk.is_dirty() {
            chunk.set_dirty(false);
            true
        } else {
            false
        }
    }
}

struct UpdateJob {
    position: IVec3,
    priority: i32,
    chunk: SharedChunk,
}

/// A processed chunk waiting for its mesh to be rebuilt.
pub struct VboUpdate {
    pub position: IVec3,
    pub priority: i32, // Lower = nearer to the focus (distance squared)
    pub chunk: SharedChunk,
}

// Ordering for priority queue (min-heap by priority)
impl PartialEq for VboUpdate {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for VboUpdate {}

impl PartialOrd for VboUpdate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VboUpdate {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.cmp(&self.priority)
    }
}

#[derive(Default)]
struct UpdateStats {
    total: Duration,
    count: u32,
}

/// State shared with the worker threads.
#[derive(Default)]
struct Shared {
    processing: Mutex<FxHashSet<IVec3>>,
    vbo_updates: Mutex<BinaryHeap<VboUpdate>>,
    stats: Mutex<UpdateStats>,
}

/// Manages background chunk updates with worker threads
pub struct WorldUpdateManager {
    job_tx: Option<Sender<UpdateJob>>,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

fn priority_of(position: IVec3, focus: IVec3) -> i32 {
    (position - focus).length_squared()
}

impl WorldUpdateManager {
    pub fn new(ctx: Arc<WorldContext>) -> Self {
        let worker_count = ctx.settings().update.effective_worker_count();
        Self::with_worker_count(worker_count, ChunkPipeline::from_settings(ctx))
    }

    /// Manager with `num_workers` workers sharing one `processor`.
    pub fn with_worker_count(num_workers: usize, processor: impl ChunkProcessor) -> Self {
        let num_workers = num_workers.max(1);
        let (job_tx, job_rx) = bounded::<UpdateJob>(num_workers);
        let shared = Arc::new(Shared::default());
        let processor = Arc::new(processor);

        let mut workers = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = job_rx.clone();
            let shared = shared.clone();
            let processor = processor.clone();

            let spawned = thread::Builder::new()
                .name(format!("chunk-update-{}", worker_id))
                .spawn(move || worker_loop(rx, shared, processor.as_ref()));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => error!("Failed to spawn chunk update worker {}: {}", worker_id, e),
            }
        }
        info!("Started {} chunk update workers", workers.len());

        WorldUpdateManager {
            job_tx: Some(job_tx),
            shared,
            workers,
        }
    }

    /// Maximum number of chunks in flight at once.
    pub fn capacity(&self) -> usize {
        self.workers.len()
    }

    /// Hands `chunk` to a worker unless it is already in flight or all
    /// workers are busy. Rejected chunks should be offered again next tick.
    pub fn queue_chunk_update(&self, chunk: &SharedChunk, focus: IVec3) -> bool {
        // A locked chunk is being processed or edited right now
        let Some(position) = chunk.try_read().map(|c| c.position()) else {
            trace!("Chunk is locked, skipping update");
            return false;
        };
        self.admit(position, priority_of(position, focus), chunk)
    }

    fn admit(&self, position: IVec3, priority: i32, chunk: &SharedChunk) -> bool {
        let Some(job_tx) = &self.job_tx else {
            return false;
        };

        {
            let mut processing = self.shared.processing.lock();
            if processing.contains(&position) || processing.len() >= self.capacity() {
                trace!("Update of chunk {} deferred", position);
                return false;
            }
            processing.insert(position);
        }

        let job = UpdateJob {
            position,
            priority,
            chunk: chunk.clone(),
        };
        match job_tx.try_send(job) {
            Ok(()) => true,
            Err(_) => {
                self.shared.processing.lock().remove(&position);
                false
            }
        }
    }

    /// Offers every chunk of `visible` that needs work, nearest first.
    /// Returns how many were admitted.
    pub fn queue_chunk_updates(&self, visible: &[SharedChunk], focus: IVec3) -> usize {
        let mut candidates: Vec<_> = visible
            .iter()
            .filter_map(|chunk| {
                let guard = chunk.try_read()?;
                if !guard.needs_update() {
                    return None;
                }
                let position = guard.position();
                Some((position, priority_of(position, focus), chunk))
            })
            .filter(|(position, _, _)| !self.is_processing(*position))
            .collect();
        candidates.sort_by_key(|(_, priority, _)| *priority);

        let mut admitted = 0;
        for (position, priority, chunk) in candidates {
            if self.processing_count() >= self.capacity() {
                break;
            }
            if self.admit(position, priority, chunk) {
                admitted += 1;
            }
        }
        if admitted > 0 {
            debug!("Queued {} chunk updates", admitted);
        }
        admitted
    }

    /// Drains every finished chunk, nearest first, into `consumer`.
    /// Must be called from the thread that owns the meshes.
    pub fn update_vbos(&self, mut consumer: impl FnMut(IVec3, &SharedChunk)) -> usize {
        let mut consumed = 0;
        loop {
            let next = self.shared.vbo_updates.lock().pop();
            let Some(update) = next else {
                break;
            };
            consumer(update.position, &update.chunk);
            consumed += 1;
        }
        consumed
    }

    pub fn vbo_updates_size(&self) -> usize {
        self.shared.vbo_updates.lock().len()
    }

    pub fn is_processing(&self, position: IVec3) -> bool {
        self.shared.processing.lock().contains(&position)
    }

    pub fn processing_count(&self) -> usize {
        self.shared.processing.lock().len()
    }

    /// Mean time a worker spent on one chunk, zero before the first update.
    pub fn average_update_duration(&self) -> Duration {
        let stats = self.shared.stats.lock();
        if stats.count == 0 {
            Duration::ZERO
        } else {
            stats.total / stats.count
        }
    }
}

fn worker_loop(rx: Receiver<UpdateJob>, shared: Arc<Shared>, processor: &dyn ChunkProcessor) {
    for job in rx.iter() {
        let start = Instant::now();
        let changed = {
            let mut chunk = job.chunk.write();
            processor.process_chunk(&mut chunk)
        };

        {
            let mut stats = shared.stats.lock();
            stats.total += start.elapsed();
            stats.count = stats.count.saturating_add(1);
        }

        if changed {
            shared.vbo_updates.lock().push(VboUpdate {
                position: job.position,
                priority: job.priority,
                chunk: job.chunk,
            });
        }
        shared.processing.lock().remove(&job.position);
    }
}

impl Drop for WorldUpdateManager {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Chunk update worker panicked");
            }
        }
        debug!("Chunk update workers stopped");
    }
}
