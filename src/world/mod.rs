//! World algorithms and chunk management
//! Contains generation, lighting, liquids, views and background updates.

pub mod context;
pub mod generator;
pub mod lighting;
pub mod liquid;
pub mod provider;
pub mod update_manager;
pub mod view;

// Re-export commonly used types
pub use context::WorldContext;
pub use generator::{ChunkGenerator, FlatGenerator, TerrainGenerator};
pub use lighting::{LightPropagator, generate_internal_lighting};
pub use liquid::{LiquidSimulator, calc_state_for};
pub use provider::{LocalChunkProvider, ProviderUpdate};
pub use update_manager::{ChunkPipeline, ChunkProcessor, SharedChunk, WorldUpdateManager};
pub use view::WorldView;
