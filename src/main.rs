//! Headless voxel world runner
//!
//! Loads the chunks around the origin, lets the update workers generate and
//! light them, pours a liquid source into the center chunk and steps the
//! liquid simulation. The chunk store is written back on exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use glam::IVec3;
use tracing::{debug, error, info, warn};

use voxel_core::core::CHUNK_SIZE;
use voxel_core::settings::load_or_default;
use voxel_core::world::LightPropagator;
use voxel_core::{
    BlockId, BlockRegistry, ChunkStore, DEFAULT_STORE_FILE, EngineSettings, LiquidSimulator,
    LocalChunkProvider, StoreError, TICK_LENGTH_MS, ViewError, WorldContext, WorldUpdateManager,
    WorldView,
};

/// Headless voxel world simulation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed
    #[arg(long)]
    seed: Option<u32>,

    /// Chunks loaded in each direction around the origin
    #[arg(long)]
    radius: Option<i32>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Chunk update worker threads (default: half the processors)
    #[arg(long)]
    workers: Option<usize>,

    /// Chunk store file, read on start and written on exit
    #[arg(long, default_value = DEFAULT_STORE_FILE)]
    store: PathBuf,

    /// Generate a flat world instead of noise terrain
    #[arg(long, default_value_t = false)]
    flat: bool,

    /// Engine settings file
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn settings_from_args(args: &Args) -> EngineSettings {
    let mut settings = args
        .settings
        .as_deref()
        .map(load_or_default)
        .unwrap_or_default();

    if let Some(seed) = args.seed {
        settings.world.seed = seed;
    }
    if let Some(radius) = args.radius {
        settings.world.load_radius = radius.max(1);
        settings.world.unload_radius = settings.world.unload_radius.max(radius + 2);
    }
    if args.workers.is_some() {
        settings.update.worker_count = args.workers;
    }
    settings.world.flat |= args.flat;
    settings
}

fn open_store(path: &Path, compression_level: u32) -> ChunkStore {
    if !path.exists() {
        return ChunkStore::with_compression_level(compression_level);
    }
    match ChunkStore::load_from_file(path, compression_level) {
        Ok(store) => store,
        Err(e) => {
            warn!("Starting with an empty store, cannot read {}: {}", path.display(), e);
            ChunkStore::with_compression_level(compression_level)
        }
    }
}

/// Highest non-air block of the column, in view coordinates.
fn surface_at(view: &WorldView<'_>, x: i32, z: i32) -> Option<IVec3> {
    (0..CHUNK_SIZE.y)
        .rev()
        .map(|y| IVec3::new(x, y, z))
        .find(|&pos| view.block(pos) != BlockId::AIR)
}

fn run(args: Args) -> Result<(), StoreError> {
    let settings = settings_from_args(&args);
    let compression_level = settings.store.compression_level;
    let ctx = WorldContext::new(BlockRegistry::with_defaults(), settings);
    info!(
        "Seed {}, load radius {}, {} ticks",
        ctx.settings().world.seed,
        ctx.settings().world.load_radius,
        args.ticks
    );

    let store = Arc::new(open_store(&args.store, compression_level));
    let manager = WorldUpdateManager::new(ctx.clone());
    let mut provider = LocalChunkProvider::new(ctx.clone(), store.clone(), manager);
    let mut liquids = LiquidSimulator::new(ctx.clone());
    let water = ctx.blocks().core().water;

    let focus = IVec3::ZERO;
    let mut poured = false;
    let mut meshes = 0;

    for tick in 0..args.ticks {
        let now = tick * TICK_LENGTH_MS;
        provider.update(focus);
        meshes += provider.update_manager().update_vbos(|_, _| {});

        let stepped = provider.with_local_view(focus, |view| {
            if !poured {
                LightPropagator::new(view, &ctx).propagate_out_of_target_chunk();
                let center = CHUNK_SIZE / 2;
                if let Some(surface) = surface_at(view, center.x, center.z) {
                    let source = surface + IVec3::Y;
                    view.set_block(source, water);
                    liquids.block_changed(source, view, now);
                    info!("Poured water at {}", view.to_world_pos(source));
                }
                poured = true;
            }
            liquids.run_due(now, view)
        });
        match stepped {
            Ok(_) => {}
            Err(ViewError::ChunkNotReady(pos)) => debug!("Waiting for chunk {}", pos),
            Err(e) => warn!("Skipping liquid step: {}", e),
        }

        thread::sleep(Duration::from_millis(TICK_LENGTH_MS));
    }

    let stale = provider
        .with_local_view(focus, |view| liquids.review_chunk(view).len())
        .unwrap_or_default();
    info!(
        "Finished: {} chunks loaded, {} meshes rebuilt, {} liquid blocks pending, {} stale",
        provider.loaded_count(),
        meshes,
        liquids.pending(),
        stale
    );
    info!(
        "Average chunk update took {:?}",
        provider.update_manager().average_update_duration()
    );

    provider.flush()?;
    store.save_to_file(&args.store)?;
    info!("Store holds {} chunks, {} bytes", store.len(), store.size_in_bytes());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting voxel world...");
    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}
