//! Sunlight and block light flood fill.
//!
//! [`generate_internal_lighting`] lights a single chunk in isolation: sunlight
//! first falls straight down each open column at full strength, then spreads
//! breadth-first losing one level per block. [`LightPropagator`] continues the
//! same fill across chunk borders through a [`WorldView`].

use std::collections::VecDeque;

use glam::IVec3;

use crate::constants::MAX_LIGHT;
use crate::core::block::{BlockId, BlockRegistry};
use crate::core::chunk::{CHUNK_SIZE, Chunk};
use crate::core::math::{Region3, Side};
use crate::world::context::WorldContext;
use crate::world::view::WorldView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightChannel {
    Sun,
    Block,
}

/// Storage the flood fill can read blocks from and write light into.
trait LightGrid {
    fn in_range(&self, pos: IVec3) -> bool;
    fn block_at(&self, pos: IVec3) -> BlockId;
    fn light_at(&self, channel: LightChannel, pos: IVec3) -> u8;
    fn set_light_at(&mut self, channel: LightChannel, pos: IVec3, value: u8);
}

impl LightGrid for Chunk {
    fn in_range(&self, pos: IVec3) -> bool {
        Chunk::in_bounds(pos)
    }

    fn block_at(&self, pos: IVec3) -> BlockId {
        self.block(pos)
    }

    fn light_at(&self, channel: LightChannel, pos: IVec3) -> u8 {
        match channel {
            LightChannel::Sun => self.sunlight(pos),
            LightChannel::Block => self.light(pos),
        }
    }

    fn set_light_at(&mut self, channel: LightChannel, pos: IVec3, value: u8) {
        match channel {
            LightChannel::Sun => self.set_sunlight(pos, value),
            LightChannel::Block => self.set_light(pos, value),
        }
    }
}

impl LightGrid for WorldView<'_> {
    fn in_range(&self, pos: IVec3) -> bool {
        self.contains(pos)
    }

    fn block_at(&self, pos: IVec3) -> BlockId {
        self.block(pos)
    }

    fn light_at(&self, channel: LightChannel, pos: IVec3) -> u8 {
        match channel {
            LightChannel::Sun => self.sunlight(pos),
            LightChannel::Block => self.light(pos),
        }
    }

    fn set_light_at(&mut self, channel: LightChannel, pos: IVec3, value: u8) {
        match channel {
            LightChannel::Sun => self.set_sunlight(pos, value),
            LightChannel::Block => self.set_light(pos, value),
        };
    }
}

/// Spreads light outwards from every queued position until nothing brightens.
/// Returns the region of positions whose light changed.
fn flood<G: LightGrid>(
    grid: &mut G,
    blocks: &BlockRegistry,
    channel: LightChannel,
    max_light: u8,
    mut queue: VecDeque<IVec3>,
) -> Region3 {
    let mut affected = Region3::EMPTY;

    while let Some(pos) = queue.pop_front() {
        let value = grid.light_at(channel, pos);
        if value <= 1 {
            continue;
        }
        let block = blocks.get(grid.block_at(pos));

        for side in Side::ALL {
            // full sunlight never travels upwards
            if side == Side::Top && channel == LightChannel::Sun && value >= max_light {
                continue;
            }
            let adj = pos + side.vector();
            if !grid.in_range(adj) {
                continue;
            }
            let adj_block = blocks.get(grid.block_at(adj));
            if !block.can_spread_light_out_of(side)
                || !adj_block.can_spread_light_into(side.reverse())
            {
                continue;
            }
            if grid.light_at(channel, adj) < value - 1 {
                grid.set_light_at(channel, adj, value - 1);
                affected = affected.expand_to_contain(adj);
                queue.push_back(adj);
            }
        }
    }

    affected
}

/// Computes sunlight and block light for a chunk without looking at its
/// neighbours, then clears the chunk's light-dirty flag.
pub fn generate_internal_lighting(chunk: &mut Chunk, ctx: &WorldContext) {
    let blocks = ctx.blocks();
    let max_light = ctx.lighting().max_light.min(MAX_LIGHT);
    chunk.clear_lighting();

    let mut sun_queue = VecDeque::new();
    for z in 0..CHUNK_SIZE.z {
        for x in 0..CHUNK_SIZE.x {
            let mut above = blocks.get(BlockId::AIR);
            for y in (0..CHUNK_SIZE.y).rev() {
                let pos = IVec3::new(x, y, z);
                let block = blocks.get(chunk.block(pos));
                if above.can_spread_light_out_of(Side::Bottom)
                    && block.can_spread_light_into(Side::Top)
                    && block.keeps_full_sunlight()
                {
                    chunk.set_sunlight(pos, max_light);
                    sun_queue.push_back(pos);
                    above = block;
                } else {
                    break;
                }
            }
        }
    }
    flood(chunk, blocks, LightChannel::Sun, max_light, sun_queue);

    let mut block_queue = VecDeque::new();
    for pos in Region3::from_min_and_size(IVec3::ZERO, CHUNK_SIZE).iter() {
        let luminance = blocks.get(chunk.block(pos)).luminance.min(max_light);
        if luminance > 0 {
            chunk.set_light(pos, luminance);
            block_queue.push_back(pos);
        }
    }
    flood(chunk, blocks, LightChannel::Block, max_light, block_queue);

    chunk.set_light_dirty(false);
}

/// Connects the light of a view's center chunk to its neighbours.
pub struct LightPropagator<'v, 'a> {
    view: &'v mut WorldView<'a>,
    ctx: &'v WorldContext,
}

impl<'v, 'a> LightPropagator<'v, 'a> {
    pub fn new(view: &'v mut WorldView<'a>, ctx: &'v WorldContext) -> Self {
        LightPropagator { view, ctx }
    }

    /// Pushes both light channels out of every border block of the center
    /// chunk. Returns the affected region in view coordinates.
    pub fn propagate_out_of_target_chunk(&mut self) -> Region3 {
        let max_light = self.ctx.lighting().max_light.min(MAX_LIGHT);
        let border: Vec<IVec3> = self
            .view
            .center_region()
            .iter()
            .filter(|p| p.x == 0 || p.z == 0 || p.x == CHUNK_SIZE.x - 1 || p.z == CHUNK_SIZE.z - 1)
            .collect();

        let mut affected = Region3::EMPTY;
        for channel in [LightChannel::Sun, LightChannel::Block] {
            let queue = border
                .iter()
                .copied()
                .filter(|&p| self.view.light_at(channel, p) > 1)
                .collect();
            let region = flood(&mut *self.view, self.ctx.blocks(), channel, max_light, queue);
            affected = Region3::encompassing(affected, region);
        }
        tracing::trace!(
            "Propagated light out of chunk {}, {} blocks affected",
            self.view.center_chunk(),
            affected.volume()
        );
        affected
    }
}
