use std::fmt;

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::core::block::BlockId;
use crate::core::liquid::LiquidData;

pub const CHUNK_SIZE: IVec3 = IVec3::new(CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z);

/// A 16×256×16 column of blocks with per-block sunlight, block light and
/// liquid state.
///
/// All block accessors take chunk-local coordinates. Reads outside the chunk
/// return air, darkness or a dry state; writes outside the chunk are ignored.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    position: IVec3,
    blocks: Vec<u8>,
    sunlight: Vec<u8>,
    light: Vec<u8>,
    liquid: Vec<u8>,
    fresh: bool,
    light_dirty: bool,
    dirty: bool,
}

impl Chunk {
    /// Creates an empty chunk waiting for generation.
    pub fn new(position: IVec3) -> Self {
        Chunk {
            position,
            blocks: vec![BlockId::AIR.0; CHUNK_VOLUME],
            sunlight: vec![0; CHUNK_VOLUME],
            light: vec![0; CHUNK_VOLUME],
            liquid: vec![0; CHUNK_VOLUME],
            fresh: true,
            light_dirty: false,
            dirty: false,
        }
    }

    pub fn position(&self) -> IVec3 {
        self.position
    }

    /// World position of the block at local (0, 0, 0).
    pub fn world_min(&self) -> IVec3 {
        self.position * CHUNK_SIZE
    }

    pub fn in_bounds(local: IVec3) -> bool {
        local.cmpge(IVec3::ZERO).all() && local.cmplt(CHUNK_SIZE).all()
    }

    fn index(local: IVec3) -> Option<usize> {
        Self::in_bounds(local)
            .then(|| (local.x + CHUNK_SIZE_X * (local.z + CHUNK_SIZE_Z * local.y)) as usize)
    }

    pub fn block(&self, local: IVec3) -> BlockId {
        Self::index(local).map_or(BlockId::AIR, |i| BlockId(self.blocks[i]))
    }

    /// Returns the previous block.
    pub fn set_block(&mut self, local: IVec3, block: BlockId) -> BlockId {
        let Some(i) = Self::index(local) else {
            return BlockId::AIR;
        };
        let old = BlockId(self.blocks[i]);
        if old != block {
            self.blocks[i] = block.0;
            self.dirty = true;
        }
        old
    }

    pub fn sunlight(&self, local: IVec3) -> u8 {
        Self::index(local).map_or(0, |i| self.sunlight[i])
    }

    pub fn set_sunlight(&mut self, local: IVec3, value: u8) {
        if let Some(i) = Self::index(local) {
            self.sunlight[i] = value.min(MAX_LIGHT);
        }
    }

    pub fn light(&self, local: IVec3) -> u8 {
        Self::index(local).map_or(0, |i| self.light[i])
    }

    pub fn set_light(&mut self, local: IVec3, value: u8) {
        if let Some(i) = Self::index(local) {
            self.light[i] = value.min(MAX_LIGHT);
        }
    }

    pub fn liquid(&self, local: IVec3) -> LiquidData {
        Self::index(local).map_or(LiquidData::DRY, |i| LiquidData::from_byte(self.liquid[i]))
    }

    pub fn set_liquid(&mut self, local: IVec3, state: LiquidData) {
        if let Some(i) = Self::index(local) {
            self.liquid[i] = state.to_byte();
        }
    }

    /// Resets both light channels to darkness.
    pub fn clear_lighting(&mut self) {
        self.sunlight.fill(0);
        self.light.fill(0);
    }

    pub fn raw_blocks(&self) -> &[u8] {
        &self.blocks
    }

    pub fn raw_sunlight(&self) -> &[u8] {
        &self.sunlight
    }

    pub fn raw_light(&self) -> &[u8] {
        &self.light
    }

    pub fn raw_liquid(&self) -> &[u8] {
        &self.liquid
    }

    /// Every per-block array covers the whole chunk.
    pub fn is_well_formed(&self) -> bool {
        [&self.blocks, &self.sunlight, &self.light, &self.liquid]
            .iter()
            .all(|values| values.len() == CHUNK_VOLUME)
    }

    /// Not yet generated.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Marks generation as complete; internal lighting becomes due.
    pub fn mark_generated(&mut self) {
        self.fresh = false;
        self.light_dirty = true;
        self.dirty = true;
    }

    pub fn is_light_dirty(&self) -> bool {
        self.light_dirty
    }

    pub fn set_light_dirty(&mut self, light_dirty: bool) {
        self.light_dirty = light_dirty;
    }

    /// Mesh is out of date.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn needs_update(&self) -> bool {
        self.fresh || self.light_dirty || self.dirty
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("position", &self.position)
            .field("fresh", &self.fresh)
            .field("light_dirty", &self.light_dirty)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Chunk containing a world block position.
pub fn chunk_pos_of(world_pos: IVec3) -> IVec3 {
    world_pos.div_euclid(CHUNK_SIZE)
}

/// Position of a world block relative to its chunk.
pub fn local_pos_of(world_pos: IVec3) -> IVec3 {
    world_pos.rem_euclid(CHUNK_SIZE)
}
