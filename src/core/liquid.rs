use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::constants::MAX_LIQUID_DEPTH;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum LiquidType {
    #[default]
    Water,
    Lava,
}

impl LiquidType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => LiquidType::Lava,
            _ => LiquidType::Water,
        }
    }

    fn bits(self) -> u8 {
        match self {
            LiquidType::Water => 0,
            LiquidType::Lava => 1,
        }
    }
}

/// Liquid state of a single block: its kind and a depth from 0 (dry) to
/// [`MAX_LIQUID_DEPTH`].
///
/// Two dry states are equal whatever their kind.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LiquidData {
    kind: LiquidType,
    depth: u8,
}

impl LiquidData {
    pub const DRY: LiquidData = LiquidData {
        kind: LiquidType::Water,
        depth: 0,
    };

    /// Depth is clamped to [`MAX_LIQUID_DEPTH`].
    pub fn new(kind: LiquidType, depth: u8) -> Self {
        LiquidData {
            kind,
            depth: depth.min(MAX_LIQUID_DEPTH),
        }
    }

    pub fn source(kind: LiquidType) -> Self {
        Self::new(kind, MAX_LIQUID_DEPTH)
    }

    /// Unpacks `depth | kind << 3`.
    pub fn from_byte(raw: u8) -> Self {
        LiquidData {
            kind: LiquidType::from_bits((raw >> 3) & 0x7),
            depth: raw & 0x7,
        }
    }

    pub fn to_byte(self) -> u8 {
        self.depth | (self.kind.bits() << 3)
    }

    pub fn kind(&self) -> LiquidType {
        self.kind
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn is_dry(&self) -> bool {
        self.depth == 0
    }
}

impl PartialEq for LiquidData {
    fn eq(&self, other: &Self) -> bool {
        if self.depth == 0 && other.depth == 0 {
            return true;
        }
        self.depth == other.depth && self.kind == other.kind
    }
}

impl Eq for LiquidData {}

impl Hash for LiquidData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.depth.hash(state);
        if self.depth > 0 {
            self.kind.hash(state);
        }
    }
}
