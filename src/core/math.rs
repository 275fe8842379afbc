//! Integer grid helpers: the six block sides and axis aligned regions.

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// One of the six faces of a block, named from the point of view of a viewer
/// looking along +Z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 6] = [
        Side::Top,
        Side::Bottom,
        Side::Left,
        Side::Right,
        Side::Front,
        Side::Back,
    ];

    pub const HORIZONTAL: [Side; 4] = [Side::Left, Side::Right, Side::Front, Side::Back];

    /// Unit offset pointing out of this side.
    pub const fn vector(self) -> IVec3 {
        match self {
            Side::Top => IVec3::new(0, 1, 0),
            Side::Bottom => IVec3::new(0, -1, 0),
            Side::Left => IVec3::new(-1, 0, 0),
            Side::Right => IVec3::new(1, 0, 0),
            Side::Front => IVec3::new(0, 0, -1),
            Side::Back => IVec3::new(0, 0, 1),
        }
    }

    pub const fn reverse(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }

    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Side::Top | Side::Bottom)
    }
}

/// Axis aligned box of integer cells, stored as a minimum corner and a size.
///
/// A region with any non-positive size component is empty; all empty regions
/// compare equal to [`Region3::EMPTY`] through [`Region3::is_empty`] but not
/// structurally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region3 {
    min: IVec3,
    size: IVec3,
}

impl Region3 {
    pub const EMPTY: Region3 = Region3 {
        min: IVec3::ZERO,
        size: IVec3::ZERO,
    };

    pub fn from_min_and_size(min: IVec3, size: IVec3) -> Self {
        if size.cmple(IVec3::ZERO).any() {
            return Self::EMPTY;
        }
        Region3 { min, size }
    }

    /// Region spanning `min..=max` on every axis.
    pub fn from_min_and_max(min: IVec3, max: IVec3) -> Self {
        Self::from_min_and_size(min, max - min + IVec3::ONE)
    }

    /// Region of `extents` cells in every direction around `center`.
    pub fn around(center: IVec3, extents: IVec3) -> Self {
        Self::from_min_and_max(center - extents, center + extents)
    }

    pub fn encompassing(a: Region3, b: Region3) -> Self {
        match (a.is_empty(), b.is_empty()) {
            (true, _) => b,
            (_, true) => a,
            _ => Self::from_min_and_max(a.min.min(b.min), a.max().max(b.max())),
        }
    }

    pub fn min(&self) -> IVec3 {
        self.min
    }

    /// Inclusive maximum corner.
    pub fn max(&self) -> IVec3 {
        self.min + self.size - IVec3::ONE
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size.cmple(IVec3::ZERO).any()
    }

    pub fn volume(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.size.x * self.size.y * self.size.z) as usize
        }
    }

    pub fn contains(&self, pos: IVec3) -> bool {
        !self.is_empty() && pos.cmpge(self.min).all() && pos.cmple(self.max()).all()
    }

    pub fn expand_to_contain(&self, pos: IVec3) -> Region3 {
        if self.is_empty() {
            return Self::from_min_and_size(pos, IVec3::ONE);
        }
        Self::from_min_and_max(self.min.min(pos), self.max().max(pos))
    }

    /// Linear index of `pos` in iteration order, `None` when outside.
    pub fn index_of(&self, pos: IVec3) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let rel = pos - self.min;
        Some((rel.x + self.size.x * (rel.z + self.size.z * rel.y)) as usize)
    }

    /// Cells in x-fastest, then z, then y order, matching [`Region3::index_of`].
    pub fn iter(&self) -> impl Iterator<Item = IVec3> + use<> {
        let min = self.min;
        let max = self.max();
        let empty = self.is_empty();
        (min.y..=max.y)
            .flat_map(move |y| (min.z..=max.z).map(move |z| (y, z)))
            .flat_map(move |(y, z)| (min.x..=max.x).map(move |x| IVec3::new(x, y, z)))
            .filter(move |_| !empty)
    }
}
