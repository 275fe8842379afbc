use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::liquid::LiquidType;
use crate::core::math::Side;
use crate::error::RegistryError;

/// Index of a block definition in a [`BlockRegistry`]. Id 0 is always air.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    /// Liquids and entities can pass through.
    pub penetrable: bool,
    /// Light can pass through.
    pub translucent: bool,
    pub luminance: u8,
    pub liquid: Option<LiquidType>,
}

impl Block {
    pub fn solid(name: &str) -> Self {
        Block {
            name: name.to_string(),
            penetrable: false,
            translucent: false,
            luminance: 0,
            liquid: None,
        }
    }

    pub fn air() -> Self {
        Block {
            name: "air".to_string(),
            penetrable: true,
            translucent: true,
            luminance: 0,
            liquid: None,
        }
    }

    pub fn liquid(name: &str, kind: LiquidType) -> Self {
        Block {
            name: name.to_string(),
            penetrable: true,
            translucent: true,
            luminance: if kind == LiquidType::Lava { 15 } else { 0 },
            liquid: Some(kind),
        }
    }

    pub fn with_translucent(mut self, translucent: bool) -> Self {
        self.translucent = translucent;
        self
    }

    pub fn with_luminance(mut self, luminance: u8) -> Self {
        self.luminance = luminance;
        self
    }

    pub fn is_liquid(&self) -> bool {
        self.liquid.is_some()
    }

    pub fn can_spread_light_out_of(&self, _side: Side) -> bool {
        self.translucent
    }

    pub fn can_spread_light_into(&self, _side: Side) -> bool {
        self.translucent
    }

    /// Sunlight falling through keeps full strength.
    pub fn keeps_full_sunlight(&self) -> bool {
        self.translucent && !self.is_liquid()
    }
}

/// Well known ids of the blocks installed by [`BlockRegistry::with_defaults`].
#[derive(Clone, Copy, Debug)]
pub struct CoreBlocks {
    pub air: BlockId,
    pub stone: BlockId,
    pub dirt: BlockId,
    pub grass: BlockId,
    pub sand: BlockId,
    pub snow: BlockId,
    pub water: BlockId,
    pub lava: BlockId,
    pub leaves: BlockId,
    pub glass: BlockId,
    pub torch: BlockId,
}

/// Block definitions by id and by name.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    by_name: FxHashMap<String, BlockId>,
    core: CoreBlocks,
}

impl BlockRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = BlockRegistry {
            blocks: Vec::new(),
            by_name: FxHashMap::default(),
            core: CoreBlocks {
                air: BlockId::AIR,
                stone: BlockId::AIR,
                dirt: BlockId::AIR,
                grass: BlockId::AIR,
                sand: BlockId::AIR,
                snow: BlockId::AIR,
                water: BlockId::AIR,
                lava: BlockId::AIR,
                leaves: BlockId::AIR,
                glass: BlockId::AIR,
                torch: BlockId::AIR,
            },
        };

        let defaults = [
            Block::air(),
            Block::solid("stone"),
            Block::solid("dirt"),
            Block::solid("grass"),
            Block::solid("sand"),
            Block::solid("snow"),
            Block::liquid("water", LiquidType::Water),
            Block::liquid("lava", LiquidType::Lava),
            Block::solid("leaves").with_translucent(true),
            Block::solid("glass").with_translucent(true),
            Block::solid("torch").with_translucent(true).with_luminance(14),
        ];
        let mut ids = Vec::with_capacity(defaults.len());
        for block in defaults {
            // a fresh registry has room for the defaults and no duplicates
            let id = BlockId(registry.blocks.len() as u8);
            registry.by_name.insert(block.name.clone(), id);
            registry.blocks.push(block);
            ids.push(id);
        }
        registry.core = CoreBlocks {
            air: ids[0],
            stone: ids[1],
            dirt: ids[2],
            grass: ids[3],
            sand: ids[4],
            snow: ids[5],
            water: ids[6],
            lava: ids[7],
            leaves: ids[8],
            glass: ids[9],
            torch: ids[10],
        };
        registry
    }

    pub fn register(&mut self, block: Block) -> Result<BlockId, RegistryError> {
        if self.by_name.contains_key(&block.name) {
            return Err(RegistryError::DuplicateName(block.name));
        }
        if self.blocks.len() > u8::MAX as usize {
            return Err(RegistryError::Full(block.name));
        }
        let id = BlockId(self.blocks.len() as u8);
        tracing::debug!("Registered block '{}' as {:?}", block.name, id);
        self.by_name.insert(block.name.clone(), id);
        self.blocks.push(block);
        Ok(id)
    }

    /// Unknown ids resolve to air.
    pub fn get(&self, id: BlockId) -> &Block {
        self.blocks
            .get(id.0 as usize)
            .unwrap_or(&self.blocks[BlockId::AIR.0 as usize])
    }

    pub fn id(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn core(&self) -> &CoreBlocks {
        &self.core
    }

    pub fn liquid_block(&self, kind: LiquidType) -> BlockId {
        match kind {
            LiquidType::Water => self.core.water,
            LiquidType::Lava => self.core.lava,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
