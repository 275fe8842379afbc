// Chunk dimensions
pub const CHUNK_SIZE_X: i32 = 16;
pub const CHUNK_SIZE_Y: i32 = 256;
pub const CHUNK_SIZE_Z: i32 = 16;
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z) as usize;

// Lighting
pub const MAX_LIGHT: u8 = 15;

// Liquids
pub const MAX_LIQUID_DEPTH: u8 = 7;
/// Outgoing flow by number of free horizontal neighbours (row) and depth (column).
pub const OUTGOING_FLOW: [[u8; 8]; 5] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 2, 3, 4, 5, 6],
    [0, 0, 1, 2, 2, 3, 3, 4],
    [0, 0, 1, 1, 1, 2, 2, 3],
    [0, 0, 1, 1, 1, 1, 2, 2],
];
/// Ticks between a block change and the liquid update of its neighbourhood.
pub const LIQUID_PROPAGATION_DELAY: u64 = 200;

// World generation
pub const SEA_LEVEL: i32 = 64;
pub const FLAT_WORLD_HEIGHT: i32 = 60;

// Chunk loading
pub const LOAD_RADIUS: i32 = 4;
pub const UNLOAD_RADIUS: i32 = 6;

// Headless runner
pub const TICK_LENGTH_MS: u64 = 50;
