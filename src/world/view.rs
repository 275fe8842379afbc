use glam::IVec3;

use crate::core::block::BlockId;
use crate::core::chunk::{CHUNK_SIZE, Chunk, chunk_pos_of, local_pos_of};
use crate::core::liquid::LiquidData;
use crate::core::math::Region3;
use crate::error::ViewError;

/// Read/write window over a block of contiguous chunks.
///
/// Positions are relative to the minimum corner of the view's center chunk,
/// so the center chunk occupies `(0, 0, 0)..CHUNK_SIZE` and its neighbours
/// are reached with negative or overflowing coordinates. Positions outside
/// every chunk of the view read as air, darkness and dry; writes there are
/// dropped.
pub struct WorldView<'a> {
    chunks: Vec<&'a mut Chunk>,
    chunk_region: Region3,
    center: IVec3,
}

impl<'a> WorldView<'a> {
    /// Builds a view over every chunk of `chunk_region`, centred on `center`.
    ///
    /// Each chunk of the region must be supplied exactly once.
    pub fn new(
        chunk_region: Region3,
        center: IVec3,
        chunks: impl IntoIterator<Item = &'a mut Chunk>,
    ) -> Result<Self, ViewError> {
        let mut slots: Vec<Option<&'a mut Chunk>> =
            (0..chunk_region.volume()).map(|_| None).collect();

        for chunk in chunks {
            let pos = chunk.position();
            let index = chunk_region
                .index_of(pos)
                .ok_or(ViewError::ForeignChunk(pos))?;
            if slots[index].is_some() {
                return Err(ViewError::DuplicateChunk(pos));
            }
            slots[index] = Some(chunk);
        }

        let chunks = slots
            .into_iter()
            .zip(chunk_region.iter())
            .map(|(slot, pos)| slot.ok_or(ViewError::MissingChunk(pos)))
            .collect::<Result<Vec<_>, _>>()?;

        if !chunk_region.contains(center) {
            return Err(ViewError::MissingChunk(center));
        }

        Ok(WorldView {
            chunks,
            chunk_region,
            center,
        })
    }

    /// View over `center` and its eight horizontal neighbours.
    pub fn local(
        center: IVec3,
        chunks: impl IntoIterator<Item = &'a mut Chunk>,
    ) -> Result<Self, ViewError> {
        Self::new(Self::local_region(center), center, chunks)
    }

    /// Chunk positions a local view around `center` needs.
    pub fn local_region(center: IVec3) -> Region3 {
        Region3::around(center, IVec3::new(1, 0, 1))
    }

    pub fn chunk_region(&self) -> Region3 {
        self.chunk_region
    }

    pub fn center_chunk(&self) -> IVec3 {
        self.center
    }

    /// View positions covered by the center chunk.
    pub fn center_region(&self) -> Region3 {
        Region3::from_min_and_size(IVec3::ZERO, CHUNK_SIZE)
    }

    pub fn to_world_pos(&self, view_pos: IVec3) -> IVec3 {
        view_pos + self.center * CHUNK_SIZE
    }

    pub fn to_view_pos(&self, world_pos: IVec3) -> IVec3 {
        world_pos - self.center * CHUNK_SIZE
    }

    /// Whether the position falls inside one of the view's chunks.
    pub fn contains(&self, view_pos: IVec3) -> bool {
        self.locate(view_pos).is_some()
    }

    pub fn chunk(&self, chunk_pos: IVec3) -> Option<&Chunk> {
        let index = self.chunk_region.index_of(chunk_pos)?;
        Some(&*self.chunks[index])
    }

    fn locate(&self, view_pos: IVec3) -> Option<(usize, IVec3)> {
        let world = self.to_world_pos(view_pos);
        let index = self.chunk_region.index_of(chunk_pos_of(world))?;
        Some((index, local_pos_of(world)))
    }

    pub fn block(&self, view_pos: IVec3) -> BlockId {
        self.locate(view_pos)
            .map_or(BlockId::AIR, |(i, local)| self.chunks[i].block(local))
    }

    pub fn set_block(&mut self, view_pos: IVec3, block: BlockId) -> bool {
        match self.locate(view_pos) {
            Some((i, local)) => {
                self.chunks[i].set_block(local, block);
                true
            }
            None => false,
        }
    }

    pub fn sunlight(&self, view_pos: IVec3) -> u8 {
        self.locate(view_pos)
            .map_or(0, |(i, local)| self.chunks[i].sunlight(local))
    }

    /// Light changes invalidate the owning chunk's mesh.
    pub fn set_sunlight(&mut self, view_pos: IVec3, value: u8) -> bool {
        match self.locate(view_pos) {
            Some((i, local)) => {
                let chunk = &mut self.chunks[i];
                chunk.set_sunlight(local, value);
                chunk.set_dirty(true);
                true
            }
            None => false,
        }
    }

    pub fn light(&self, view_pos: IVec3) -> u8 {
        self.locate(view_pos)
            .map_or(0, |(i, local)| self.chunks[i].light(local))
    }

    pub fn set_light(&mut self, view_pos: IVec3, value: u8) -> bool {
        match self.locate(view_pos) {
            Some((i, local)) => {
                let chunk = &mut self.chunks[i];
                chunk.set_light(local, value);
                chunk.set_dirty(true);
                true
            }
            None => false,
        }
    }

    /// Flags the chunk owning `view_pos` for relighting.
    pub fn mark_light_dirty(&mut self, view_pos: IVec3) -> bool {
        match self.locate(view_pos) {
            Some((i, _)) => {
                self.chunks[i].set_light_dirty(true);
                true
            }
            None => false,
        }
    }

    pub fn liquid(&self, view_pos: IVec3) -> LiquidData {
        self.locate(view_pos)
            .map_or(LiquidData::DRY, |(i, local)| self.chunks[i].liquid(local))
    }

    pub fn set_liquid(&mut self, view_pos: IVec3, state: LiquidData) -> bool {
        match self.locate(view_pos) {
            Some((i, local)) => {
                self.chunks[i].set_liquid(local, state);
                true
            }
            None => false,
        }
    }
}
