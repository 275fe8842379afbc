use serde::{Deserialize, Serialize};

use crate::core::block::{BlockId, CoreBlocks};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Desert,
    Tundra,
    Mountains,
    Ocean,
    Beach,
}

impl Biome {
    /// Block covering the surface of a column.
    pub fn surface_block(&self, blocks: &CoreBlocks) -> BlockId {
        match self {
            Biome::Plains | Biome::Forest => blocks.grass,
            Biome::Desert | Biome::Beach | Biome::Ocean => blocks.sand,
            Biome::Tundra => blocks.snow,
            Biome::Mountains => blocks.stone,
        }
    }

    /// Block between the surface and stone.
    pub fn filler_block(&self, blocks: &CoreBlocks) -> BlockId {
        match self {
            Biome::Desert | Biome::Beach | Biome::Ocean => blocks.sand,
            Biome::Mountains => blocks.stone,
            _ => blocks.dirt,
        }
    }

    pub fn filler_depth(&self) -> i32 {
        match self {
            Biome::Desert => 5,
            Biome::Mountains => 0,
            _ => 3,
        }
    }
}
