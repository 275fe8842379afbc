// Core module with fundamental types
pub mod core;

// World module with generation, lighting, liquids and chunk updates
pub mod world;

// Other modules
pub mod constants;
pub mod error;
pub mod save;
pub mod settings;

// Re-exports
pub use constants::*;
pub use crate::core::{
    Biome, Block, BlockId, BlockRegistry, Chunk, LiquidData, LiquidType, Region3, Side,
};
pub use error::{RegistryError, SettingsError, StoreError, ViewError};
pub use save::{ChunkStore, DEFAULT_STORE_FILE};
pub use settings::EngineSettings;
pub use world::{
    ChunkGenerator, ChunkPipeline, ChunkProcessor, LiquidSimulator, LocalChunkProvider,
    SharedChunk, WorldContext, WorldUpdateManager, WorldView,
};
