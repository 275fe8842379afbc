//! Cellular automaton for water and lava.
//!
//! A block's next liquid state depends only on itself and its neighbours and
//! is computed by [`calc_state_for`] without touching the world. The
//! [`LiquidSimulator`] applies those states and keeps a queue of blocks to
//! revisit after a block changes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use glam::IVec3;

use crate::core::block::BlockId;
use crate::core::chunk::CHUNK_SIZE;
use crate::core::liquid::LiquidData;
use crate::core::math::{Region3, Side};
use crate::world::context::WorldContext;
use crate::world::view::WorldView;

/// Next liquid state of the block at `pos` (view coordinates).
///
/// Solid blocks are always dry and sources keep their state. A block under
/// liquid fills to one below source depth. Otherwise the block takes the
/// strongest outflow of its horizontal neighbours that rest on solid ground;
/// opposing liquids cancel each other out.
pub fn calc_state_for(pos: IVec3, view: &WorldView<'_>, ctx: &WorldContext) -> LiquidData {
    let max_depth = ctx.liquid().source_depth();
    if !ctx.block(view.block(pos)).penetrable {
        return LiquidData::DRY;
    }

    let current = view.liquid(pos);
    if current.depth() >= max_depth {
        return current;
    }

    let above = view.liquid(pos + Side::Top.vector());
    if !above.is_dry() {
        return LiquidData::new(above.kind(), max_depth.saturating_sub(1));
    }

    let mut h1 = LiquidData::DRY;
    let mut h2 = LiquidData::DRY;
    for side in Side::HORIZONTAL {
        let adj = pos + side.vector();
        let support = ctx.block(view.block(adj + Side::Bottom.vector()));
        if support.penetrable {
            continue;
        }
        let state = outgoing_liquid(adj, view, ctx);
        if state.kind() != current.kind() || state.depth() >= current.depth() {
            if state.depth() > h1.depth() {
                h2 = h1;
                h1 = state;
            } else if state.depth() > h2.depth() {
                h2 = state;
            }
        }
    }

    if !h1.is_dry() {
        if h1.kind() == h2.kind() || h2.is_dry() {
            return h1;
        }
        let remaining = h1.depth() - h2.depth();
        if remaining > 0 {
            return LiquidData::new(h1.kind(), remaining);
        }
    }

    LiquidData::DRY
}

/// Liquid flowing out of `pos` into each neighbour, split over the number of
/// lower neighbours it can spread into.
fn outgoing_liquid(pos: IVec3, view: &WorldView<'_>, ctx: &WorldContext) -> LiquidData {
    let current = view.liquid(pos);
    if current.is_dry() {
        return LiquidData::DRY;
    }

    let available = Side::HORIZONTAL
        .iter()
        .map(|side| pos + side.vector())
        .filter(|&adj| {
            ctx.block(view.block(adj)).penetrable && view.liquid(adj).depth() < current.depth()
        })
        .count();

    let flow = &ctx.liquid().outgoing_flow;
    let row = &flow[available.min(flow.len() - 1)];
    let depth = row[(current.depth() as usize).min(row.len() - 1)];
    LiquidData::new(current.kind(), depth)
}

/// A block waiting to be simulated at a given tick.
#[derive(Clone, Copy, Debug)]
struct ScheduledBlock {
    at: u64,
    seq: u64,
    pos: IVec3,
}

// Ordering for the simulation queue (min-heap by time, then insertion order)
impl PartialEq for ScheduledBlock {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledBlock {}

impl PartialOrd for ScheduledBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Applies liquid states and revisits blocks around changes after a delay.
pub struct LiquidSimulator {
    ctx: Arc<WorldContext>,
    queue: BinaryHeap<ScheduledBlock>,
    next_seq: u64,
}

impl LiquidSimulator {
    pub fn new(ctx: Arc<WorldContext>) -> Self {
        LiquidSimulator {
            ctx,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn calc_state_for(&self, pos: IVec3, view: &WorldView<'_>) -> LiquidData {
        calc_state_for(pos, view, &self.ctx)
    }

    /// Stores the next state of `pos` and swaps the block to match.
    /// Returns whether anything changed.
    pub fn simulate(&self, pos: IVec3, view: &mut WorldView<'_>) -> bool {
        let current = view.liquid(pos);
        let next = self.calc_state_for(pos, view);
        if next == current {
            return false;
        }

        let blocks = self.ctx.blocks();
        let core = blocks.core();
        let old_block = view.block(pos);
        view.set_liquid(pos, next);
        if next.is_dry() {
            if blocks.get(old_block).is_liquid() {
                view.set_block(pos, BlockId::AIR);
            }
        } else {
            view.set_block(pos, blocks.liquid_block(next.kind()));
            let below = pos + Side::Bottom.vector();
            let below_block = view.block(below);
            if below_block == core.grass || below_block == core.snow {
                view.set_block(below, core.dirt);
            }
        }

        // sunlight passes differently through the new block
        let (old, new) = (blocks.get(old_block), blocks.get(view.block(pos)));
        if old.translucent != new.translucent
            || old.keeps_full_sunlight() != new.keeps_full_sunlight()
        {
            view.mark_light_dirty(pos);
        }
        true
    }

    /// World positions in and around the center chunk whose stored liquid
    /// state is out of date.
    pub fn review_chunk(&self, view: &WorldView<'_>) -> Vec<IVec3> {
        let region = Region3::from_min_and_size(
            IVec3::new(-1, 0, -1),
            CHUNK_SIZE + IVec3::new(2, 0, 2),
        );
        region
            .iter()
            .filter(|&pos| self.calc_state_for(pos, view) != view.liquid(pos))
            .map(|pos| view.to_world_pos(pos))
            .collect()
    }

    pub fn schedule(&mut self, world_pos: IVec3, at: u64) {
        self.queue.push(ScheduledBlock {
            at,
            seq: self.next_seq,
            pos: world_pos,
        });
        self.next_seq += 1;
    }

    fn schedule_around(&mut self, world_pos: IVec3, at: u64, include_self: bool) {
        if include_self {
            self.schedule(world_pos, at);
        }
        for side in Side::ALL {
            self.schedule(world_pos + side.vector(), at);
        }
    }

    /// Reacts to the block at `pos` (view coordinates) having been replaced.
    pub fn block_changed(&mut self, pos: IVec3, view: &mut WorldView<'_>, now: u64) {
        let at = now + self.ctx.liquid().propagation_delay;
        let (liquid, penetrable) = {
            let block = self.ctx.block(view.block(pos));
            (block.liquid, block.penetrable)
        };
        let current = view.liquid(pos);
        let world_pos = view.to_world_pos(pos);

        match liquid {
            Some(kind) => {
                if current.is_dry() {
                    let depth = self.ctx.liquid().source_depth();
                    view.set_liquid(pos, LiquidData::new(kind, depth));
                }
                self.schedule_around(world_pos, at, false);
            }
            None => {
                if !current.is_dry() {
                    view.set_liquid(pos, LiquidData::DRY);
                }
                self.schedule_around(world_pos, at, penetrable);
            }
        }
    }

    /// Simulates every block due at `now`. Blocks outside the view stay
    /// queued. Returns the number of blocks that changed.
    pub fn run_due(&mut self, now: u64, view: &mut WorldView<'_>) -> usize {
        let mut deferred = Vec::new();
        let mut changed = 0;
        let delay = self.ctx.liquid().propagation_delay;

        while self.queue.peek().is_some_and(|task| task.at <= now) {
            let Some(task) = self.queue.pop() else { break };
            let pos = view.to_view_pos(task.pos);
            if !view.contains(pos) {
                deferred.push(task);
                continue;
            }
            if self.simulate(pos, view) {
                changed += 1;
                let dried = view.liquid(pos).is_dry();
                self.schedule_around(task.pos, now + delay, dried);
            }
        }
        self.queue.extend(deferred);

        if changed > 0 {
            tracing::debug!(
                "Liquid simulation changed {} blocks, {} pending",
                changed,
                self.queue.len()
            );
        }
        changed
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_LIQUID_DEPTH;
    use crate::core::block::BlockRegistry;
    use crate::core::chunk::Chunk;
    use crate::core::liquid::LiquidType;
    use crate::settings::EngineSettings;

    /// Nine chunks around the origin with a stone floor at y = 0.
    fn floored_chunks(ctx: &WorldContext) -> Vec<Chunk> {
        let stone = ctx.blocks().core().stone;
        WorldView::local_region(IVec3::ZERO)
            .iter()
            .map(|pos| {
                let mut chunk = Chunk::new(pos);
                for z in 0..CHUNK_SIZE.z {
                    for x in 0..CHUNK_SIZE.x {
                        chunk.set_block(IVec3::new(x, 0, z), stone);
                    }
                }
                chunk
            })
            .collect()
    }

    fn place_source(view: &mut WorldView<'_>, ctx: &WorldContext, pos: IVec3) {
        view.set_block(pos, ctx.blocks().core().water);
        view.set_liquid(pos, LiquidData::source(LiquidType::Water));
    }

    #[test]
    fn test_solid_block_is_dry() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        place_source(&mut view, &ctx, IVec3::new(5, 1, 5));
        assert_eq!(calc_state_for(IVec3::new(6, 0, 5), &view, &ctx), LiquidData::DRY);
    }

    #[test]
    fn test_source_keeps_state() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let pos = IVec3::new(5, 1, 5);
        place_source(&mut view, &ctx, pos);
        assert_eq!(
            calc_state_for(pos, &view, &ctx),
            LiquidData::source(LiquidType::Water)
        );
    }

    #[test]
    fn test_horizontal_flow_decays_with_distance() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let sim = LiquidSimulator::new(ctx.clone());
        place_source(&mut view, &ctx, IVec3::new(5, 1, 5));

        let one_hop = IVec3::new(6, 1, 5);
        let first = sim.calc_state_for(one_hop, &view);
        assert_eq!(first.kind(), LiquidType::Water);
        assert!(first.depth() > 0 && first.depth() < MAX_LIQUID_DEPTH);
        assert!(sim.simulate(one_hop, &mut view));
        assert_eq!(view.block(one_hop), ctx.blocks().core().water);

        let second = sim.calc_state_for(IVec3::new(7, 1, 5), &view);
        assert!(second.depth() < first.depth());
    }

    #[test]
    fn test_flow_crosses_chunk_border() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        place_source(&mut view, &ctx, IVec3::new(0, 1, 5));
        let state = calc_state_for(IVec3::new(-1, 1, 5), &view, &ctx);
        assert!(!state.is_dry());
    }

    #[test]
    fn test_falling_liquid() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        place_source(&mut view, &ctx, IVec3::new(5, 10, 5));
        assert_eq!(
            calc_state_for(IVec3::new(5, 9, 5), &view, &ctx),
            LiquidData::new(LiquidType::Water, MAX_LIQUID_DEPTH - 1)
        );
        // nothing to stand on, so no sideways flow
        assert!(calc_state_for(IVec3::new(6, 10, 5), &view, &ctx).is_dry());
    }

    #[test]
    fn test_annexed_source_dries_dependants() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let sim = LiquidSimulator::new(ctx.clone());
        let source = IVec3::new(5, 1, 5);
        let downstream = IVec3::new(6, 1, 5);
        place_source(&mut view, &ctx, source);
        assert!(sim.simulate(downstream, &mut view));

        view.set_block(source, BlockId::AIR);
        view.set_liquid(source, LiquidData::DRY);
        assert_eq!(sim.calc_state_for(downstream, &view), LiquidData::DRY);
        assert!(sim.simulate(downstream, &mut view));
        assert_eq!(view.block(downstream), BlockId::AIR);
    }

    #[test]
    fn test_opposing_liquids_cancel() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        place_source(&mut view, &ctx, IVec3::new(4, 1, 5));
        view.set_block(IVec3::new(6, 1, 5), ctx.blocks().core().lava);
        view.set_liquid(IVec3::new(6, 1, 5), LiquidData::source(LiquidType::Lava));
        assert!(calc_state_for(IVec3::new(5, 1, 5), &view, &ctx).is_dry());
    }

    #[test]
    fn test_grass_under_liquid_turns_to_dirt() {
        let ctx = WorldContext::with_defaults();
        let core = *ctx.blocks().core();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let sim = LiquidSimulator::new(ctx.clone());
        view.set_block(IVec3::new(5, 5, 5), core.grass);
        place_source(&mut view, &ctx, IVec3::new(5, 7, 5));
        assert!(sim.simulate(IVec3::new(5, 6, 5), &mut view));
        assert_eq!(view.block(IVec3::new(5, 5, 5)), core.dirt);
    }

    #[test]
    fn test_flowing_liquid_invalidates_lighting() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let sim = LiquidSimulator::new(ctx.clone());
        place_source(&mut view, &ctx, IVec3::new(15, 1, 5));

        // flows over the border into the east chunk
        assert!(sim.simulate(IVec3::new(16, 1, 5), &mut view));
        let east = view.chunk(IVec3::new(1, 0, 0)).unwrap();
        assert!(east.is_light_dirty());
        let north = view.chunk(IVec3::new(0, 0, -1)).unwrap();
        assert!(!north.is_light_dirty());
    }

    #[test]
    fn test_oversized_source_depth_keeps_sources() {
        let mut settings = EngineSettings::default();
        settings.liquid.max_depth = 8;
        let ctx = WorldContext::new(BlockRegistry::with_defaults(), settings);
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let source = IVec3::new(5, 1, 5);
        place_source(&mut view, &ctx, source);

        assert_eq!(
            calc_state_for(source, &view, &ctx),
            LiquidData::source(LiquidType::Water)
        );
    }

    #[test]
    fn test_review_chunk_lists_stale_blocks() {
        let ctx = WorldContext::with_defaults();
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let sim = LiquidSimulator::new(ctx.clone());
        assert!(sim.review_chunk(&view).is_empty());

        place_source(&mut view, &ctx, IVec3::new(5, 1, 5));
        let stale = sim.review_chunk(&view);
        assert_eq!(stale.len(), 4);
        assert!(stale.contains(&IVec3::new(6, 1, 5)));
    }

    #[test]
    fn test_scheduled_flow_spreads_over_time() {
        let ctx = WorldContext::with_defaults();
        let delay = ctx.liquid().propagation_delay;
        let mut chunks = floored_chunks(&ctx);
        let mut view = WorldView::local(IVec3::ZERO, chunks.iter_mut()).unwrap();
        let mut sim = LiquidSimulator::new(ctx.clone());

        let source = IVec3::new(8, 1, 8);
        view.set_block(source, ctx.blocks().core().water);
        sim.block_changed(source, &mut view, 0);
        assert_eq!(view.liquid(source), LiquidData::source(LiquidType::Water));
        assert_eq!(sim.pending(), 6);

        assert_eq!(sim.run_due(delay - 1, &mut view), 0);
        assert_eq!(sim.run_due(delay, &mut view), 4);
        assert!(!view.liquid(IVec3::new(9, 1, 8)).is_dry());
        assert!(sim.pending() > 0);

        sim.run_due(delay * 10, &mut view);
        assert!(view.liquid(IVec3::new(12, 1, 8)).is_dry());
    }
}
