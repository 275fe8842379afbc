use std::sync::Arc;

use crate::core::block::{Block, BlockId, BlockRegistry};
use crate::settings::{EngineSettings, LightingSettings, LiquidSettings};

/// Everything the world algorithms need to know about the running world,
/// handed to each component instead of looked up globally.
#[derive(Debug)]
pub struct WorldContext {
    blocks: BlockRegistry,
    settings: EngineSettings,
}

impl WorldContext {
    pub fn new(blocks: BlockRegistry, settings: EngineSettings) -> Arc<Self> {
        Arc::new(WorldContext { blocks, settings })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(BlockRegistry::with_defaults(), EngineSettings::default())
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &Block {
        self.blocks.get(id)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn lighting(&self) -> &LightingSettings {
        &self.settings.lighting
    }

    pub fn liquid(&self) -> &LiquidSettings {
        &self.settings.liquid
    }
}
