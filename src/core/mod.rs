//! Core data structures for the voxel world
//! Contains blocks, liquids, biomes, chunks and grid math.

pub mod biome;
pub mod block;
pub mod chunk;
pub mod liquid;
pub mod math;

// Re-export commonly used types
pub use biome::Biome;
pub use block::{Block, BlockId, BlockRegistry, CoreBlocks};
pub use chunk::{CHUNK_SIZE, Chunk, chunk_pos_of, local_pos_of};
pub use liquid::{LiquidData, LiquidType};
pub use math::{Region3, Side};
