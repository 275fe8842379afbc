//! Keeps the chunks around a focus point loaded.

use std::sync::Arc;

use glam::IVec3;
use parking_lot::{RwLock, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::core::chunk::{Chunk, chunk_pos_of};
use crate::error::{StoreError, ViewError};
use crate::save::ChunkStore;
use crate::world::context::WorldContext;
use crate::world::update_manager::{SharedChunk, WorldUpdateManager};
use crate::world::view::WorldView;

/// What one [`LocalChunkProvider::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderUpdate {
    pub created: usize,
    pub restored: usize,
    pub evicted: usize,
    pub queued: usize,
}

/// Loads chunks near the focus, restoring them from the store when possible,
/// and evicts far chunks back into the store.
pub struct LocalChunkProvider {
    ctx: Arc<WorldContext>,
    store: Arc<ChunkStore>,
    chunks: FxHashMap<IVec3, SharedChunk>,
    update_manager: WorldUpdateManager,
}

impl LocalChunkProvider {
    pub fn new(
        ctx: Arc<WorldContext>,
        store: Arc<ChunkStore>,
        update_manager: WorldUpdateManager,
    ) -> Self {
        LocalChunkProvider {
            ctx,
            store,
            chunks: FxHashMap::default(),
            update_manager,
        }
    }

    /// Loads, evicts and schedules chunks around the world position `focus`.
    pub fn update(&mut self, focus: IVec3) -> ProviderUpdate {
        let focus_chunk = chunk_pos_of(focus) * IVec3::new(1, 0, 1);
        let world = &self.ctx.settings().world;
        let load_radius = world.load_radius.max(1);
        let unload_radius = world.unload_radius.max(load_radius);
        let mut result = ProviderUpdate::default();

        for dz in -load_radius..=load_radius {
            for dx in -load_radius..=load_radius {
                let pos = focus_chunk + IVec3::new(dx, 0, dz);
                if self.chunks.contains_key(&pos) {
                    continue;
                }
                let chunk = match self.store.get(pos) {
                    Some(mut chunk) => {
                        chunk.set_dirty(true);
                        result.restored += 1;
                        chunk
                    }
                    None => {
                        result.created += 1;
                        Chunk::new(pos)
                    }
                };
                self.chunks.insert(pos, Arc::new(RwLock::new(chunk)));
            }
        }

        let far: Vec<IVec3> = self
            .chunks
            .keys()
            .filter(|pos| {
                let d = (**pos - focus_chunk).abs();
                d.x > unload_radius || d.z > unload_radius
            })
            .copied()
            .collect();
        for pos in far {
            if self.evict(pos) {
                result.evicted += 1;
            }
        }

        let visible: Vec<SharedChunk> = self.chunks.values().cloned().collect();
        result.queued = self.update_manager.queue_chunk_updates(&visible, focus_chunk);

        if result.created + result.restored + result.evicted > 0 {
            debug!(
                "Chunks around {}: {} created, {} restored, {} evicted",
                focus_chunk, result.created, result.restored, result.evicted
            );
        }
        result
    }

    fn evict(&mut self, pos: IVec3) -> bool {
        // A worker still owns it; try again next update
        if self.update_manager.is_processing(pos) {
            return false;
        }
        let Some(shared) = self.chunks.get(&pos) else {
            return false;
        };
        if let Err(e) = self.store.put(&shared.read()) {
            warn!("Keeping chunk {} loaded: {}", pos, e);
            return false;
        }
        self.chunks.remove(&pos);
        true
    }

    pub fn chunk(&self, pos: IVec3) -> Option<&SharedChunk> {
        self.chunks.get(&pos)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    pub fn update_manager(&self) -> &WorldUpdateManager {
        &self.update_manager
    }

    /// Runs `f` over a [`WorldView`] of `center` and its eight neighbours,
    /// all write-locked for the duration.
    ///
    /// Every chunk must be generated and lit; otherwise the worker would
    /// later overwrite whatever `f` changed.
    pub fn with_local_view<R>(
        &self,
        center: IVec3,
        f: impl FnOnce(&mut WorldView<'_>) -> R,
    ) -> Result<R, ViewError> {
        let region = WorldView::local_region(center);
        let shared = region
            .iter()
            .map(|pos| self.chunks.get(&pos).ok_or(ViewError::MissingChunk(pos)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut guards: Vec<RwLockWriteGuard<'_, Chunk>> =
            shared.iter().map(|chunk| chunk.write()).collect();
        if let Some(pending) = guards
            .iter()
            .find(|chunk| chunk.is_fresh() || chunk.is_light_dirty())
        {
            return Err(ViewError::ChunkNotReady(pending.position()));
        }
        let mut view = WorldView::new(region, center, guards.iter_mut().map(|g| &mut **g))?;
        Ok(f(&mut view))
    }

    /// Writes every loaded chunk to the store, returning how many were saved.
    pub fn flush(&self) -> Result<usize, StoreError> {
        for chunk in self.chunks.values() {
            self.store.put(&chunk.read())?;
        }
        Ok(self.chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::core::block::{BlockId, BlockRegistry};
    use crate::settings::EngineSettings;
    use crate::world::update_manager::ChunkPipeline;

    fn provider() -> LocalChunkProvider {
        let mut settings = EngineSettings::default();
        settings.world.flat = true;
        settings.world.load_radius = 1;
        settings.world.unload_radius = 2;
        let ctx = WorldContext::new(BlockRegistry::with_defaults(), settings);
        let pipeline = ChunkPipeline::from_settings(ctx.clone());
        let manager = WorldUpdateManager::with_worker_count(1, pipeline);
        LocalChunkProvider::new(ctx, Arc::new(ChunkStore::new()), manager)
    }

    fn wait_until_idle(provider: &LocalChunkProvider) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while provider.update_manager().processing_count() > 0 {
            assert!(Instant::now() < deadline, "workers did not finish");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Keeps updating until every loaded chunk is generated and lit.
    fn settle(provider: &mut LocalChunkProvider, focus: IVec3) {
        let deadline = Instant::now() + Duration::from_secs(60);
        loop {
            provider.update(focus);
            wait_until_idle(provider);
            let ready = provider.chunks.values().all(|chunk| {
                let chunk = chunk.read();
                !chunk.is_fresh() && !chunk.is_light_dirty()
            });
            if ready {
                return;
            }
            assert!(Instant::now() < deadline, "chunks never became ready");
        }
    }

    #[test]
    fn test_loads_square_around_focus() {
        let mut provider = provider();
        let result = provider.update(IVec3::new(8, 70, 8));
        assert_eq!(result.created, 9);
        assert_eq!(result.restored, 0);
        assert_eq!(result.queued, 1);
        assert_eq!(provider.loaded_count(), 9);
        assert!(provider.chunk(IVec3::new(-1, 0, 1)).is_some());
        assert!(provider.chunk(IVec3::new(2, 0, 0)).is_none());
        wait_until_idle(&provider);
    }

    #[test]
    fn test_evicted_chunks_are_restored() {
        let mut provider = provider();
        provider.update(IVec3::ZERO);
        wait_until_idle(&provider);

        let marked = IVec3::new(1, 0, 0);
        provider
            .chunk(marked)
            .unwrap()
            .write()
            .set_block(IVec3::new(3, 100, 3), BlockId(7));

        let away = provider.update(IVec3::new(160, 0, 0));
        assert_eq!(away.evicted, 9);
        assert!(provider.store().contains(marked));
        assert!(provider.chunk(marked).is_none());
        wait_until_idle(&provider);

        let back = provider.update(IVec3::ZERO);
        assert_eq!(back.restored, 9);
        let chunk = provider.chunk(marked).unwrap();
        assert_eq!(chunk.read().block(IVec3::new(3, 100, 3)), BlockId(7));
        wait_until_idle(&provider);
    }

    #[test]
    fn test_local_view_waits_for_generation() {
        let mut provider = provider();
        provider.update(IVec3::ZERO);
        wait_until_idle(&provider);
        let west = IVec3::new(-1, 0, 0);
        assert!(provider.chunk(west).unwrap().read().is_fresh());

        let mut ran = false;
        let result = provider.with_local_view(IVec3::ZERO, |view| {
            ran = true;
            view.set_block(IVec3::new(-1, 10, 0), BlockId(10))
        });
        assert_eq!(result, Err(ViewError::ChunkNotReady(IVec3::new(-1, 0, -1))));
        assert!(!ran);

        settle(&mut provider, IVec3::ZERO);
        let placed = provider.with_local_view(IVec3::ZERO, |view| {
            view.set_block(IVec3::new(-1, 10, 0), BlockId(10))
        });
        assert_eq!(placed, Ok(true));
        let chunk = provider.chunk(west).unwrap();
        assert_eq!(chunk.read().block(IVec3::new(15, 10, 0)), BlockId(10));
    }

    #[test]
    fn test_local_view_needs_all_neighbours() {
        let mut provider = provider();
        settle(&mut provider, IVec3::ZERO);

        let placed = provider.with_local_view(IVec3::ZERO, |view| {
            view.set_block(IVec3::new(-1, 200, 16), BlockId(3))
        });
        assert_eq!(placed, Ok(true));
        let corner = provider.chunk(IVec3::new(-1, 0, 1)).unwrap();
        assert_eq!(corner.read().block(IVec3::new(15, 200, 0)), BlockId(3));

        let missing = provider.with_local_view(IVec3::new(1, 0, 0), |_| ());
        assert_eq!(missing, Err(ViewError::MissingChunk(IVec3::new(2, 0, -1))));

        assert_eq!(provider.flush().unwrap(), 9);
        assert_eq!(provider.store().len(), 9);
    }
}
