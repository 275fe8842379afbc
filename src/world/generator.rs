//! Chunk generation using FastNoiseLite
//!
//! Generation runs in two stages: facets describe a property of every column
//! of the chunk (biome, surface height), then the rasterizer turns the facets
//! into blocks. Generators are `Send + Sync` so chunk update workers can share
//! one instance.

use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use glam::IVec3;

use crate::constants::*;
use crate::core::biome::Biome;
use crate::core::chunk::Chunk;
use crate::core::liquid::{LiquidData, LiquidType};
use crate::world::context::WorldContext;

/// Fills a fresh chunk with blocks.
pub trait ChunkGenerator: Send + Sync {
    fn generate_chunk(&self, chunk: &mut Chunk);
}

/// One value per (x, z) column of a chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnFacet<T> {
    values: Vec<T>,
}

impl<T: Copy> ColumnFacet<T> {
    fn from_fn(mut f: impl FnMut(i32, i32) -> T) -> Self {
        let mut values = Vec::with_capacity((CHUNK_SIZE_X * CHUNK_SIZE_Z) as usize);
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                values.push(f(x, z));
            }
        }
        ColumnFacet { values }
    }

    pub fn get(&self, x: i32, z: i32) -> T {
        self.values[(x + CHUNK_SIZE_X * z) as usize]
    }
}

pub type BiomeFacet = ColumnFacet<Biome>;
pub type SurfaceHeightFacet = ColumnFacet<i32>;

/// Stone up to a fixed height, topped with grass.
pub struct FlatGenerator {
    ctx: Arc<WorldContext>,
    height: i32,
}

impl FlatGenerator {
    pub fn new(ctx: Arc<WorldContext>) -> Self {
        Self::with_height(ctx, FLAT_WORLD_HEIGHT)
    }

    pub fn with_height(ctx: Arc<WorldContext>, height: i32) -> Self {
        FlatGenerator {
            ctx,
            height: height.clamp(1, CHUNK_SIZE_Y - 1),
        }
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate_chunk(&self, chunk: &mut Chunk) {
        let blocks = self.ctx.blocks().core();
        for y in 0..self.height {
            let block = if y == self.height - 1 {
                blocks.grass
            } else {
                blocks.stone
            };
            for z in 0..CHUNK_SIZE_Z {
                for x in 0..CHUNK_SIZE_X {
                    chunk.set_block(IVec3::new(x, y, z), block);
                }
            }
        }
    }
}

/// Noise based terrain with biomes and oceans.
pub struct TerrainGenerator {
    ctx: Arc<WorldContext>,
    noise_continents: FastNoiseLite,
    noise_terrain: FastNoiseLite,
    noise_detail: FastNoiseLite,
    noise_temperature: FastNoiseLite,
    noise_moisture: FastNoiseLite,
    pub seed: u32,
}

impl TerrainGenerator {
    pub fn new(ctx: Arc<WorldContext>) -> Self {
        let seed = ctx.settings().world.seed;
        TerrainGenerator {
            ctx,
            noise_continents: Self::create_noise(seed, 0.002),
            noise_terrain: Self::create_fbm_noise(seed.wrapping_add(1), 0.008),
            noise_detail: Self::create_fbm_noise(seed.wrapping_add(2), 0.015),
            noise_temperature: Self::create_noise(seed.wrapping_add(3), 0.008),
            noise_moisture: Self::create_noise(seed.wrapping_add(4), 0.01),
            seed,
        }
    }

    fn create_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        noise
    }

    fn create_fbm_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = Self::create_noise(seed, frequency);
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(4));
        noise.set_fractal_lacunarity(Some(2.0));
        noise.set_fractal_gain(Some(0.5));
        noise
    }

    pub fn biome_facet(&self, chunk_pos: IVec3) -> BiomeFacet {
        let base = chunk_pos * IVec3::new(CHUNK_SIZE_X, 0, CHUNK_SIZE_Z);
        ColumnFacet::from_fn(|x, z| self.biome_at(base.x + x, base.z + z))
    }

    pub fn height_facet(&self, chunk_pos: IVec3, biomes: &BiomeFacet) -> SurfaceHeightFacet {
        let base = chunk_pos * IVec3::new(CHUNK_SIZE_X, 0, CHUNK_SIZE_Z);
        ColumnFacet::from_fn(|x, z| self.height_at(base.x + x, base.z + z, biomes.get(x, z)))
    }

    fn biome_at(&self, x: i32, z: i32) -> Biome {
        let fx = x as f32;
        let fz = z as f32;

        let continent = self.noise_continents.get_noise_2d(fx, fz);
        if continent < -0.35 {
            return Biome::Ocean;
        }
        if continent < -0.2 {
            return Biome::Beach;
        }

        let temp = self.noise_temperature.get_noise_2d(fx, fz);
        let moist = self.noise_moisture.get_noise_2d(fx, fz);
        if temp < -0.3 {
            Biome::Tundra
        } else if temp > 0.5 && moist < -0.2 {
            Biome::Desert
        } else if moist > -0.2 {
            Biome::Forest
        } else if self.noise_terrain.get_noise_2d(fx * 0.5, fz * 0.5) > 0.4 {
            Biome::Mountains
        } else {
            Biome::Plains
        }
    }

    fn height_at(&self, x: i32, z: i32, biome: Biome) -> i32 {
        let fx = x as f32;
        let fz = z as f32;
        let sea_level = self.ctx.settings().world.sea_level as f64;

        let continental = self.noise_continents.get_noise_2d(fx, fz) as f64;
        let terrain = self.noise_terrain.get_noise_2d(fx, fz) as f64;
        let detail = self.noise_detail.get_noise_2d(fx, fz) as f64;

        let height = match biome {
            Biome::Ocean => sea_level - 20.0 + (continental + 1.0) * 7.5 + detail * 3.0,
            Biome::Beach => sea_level + terrain * 2.0 + detail,
            Biome::Plains => sea_level + 2.0 + terrain * 4.0 + detail * 2.0,
            Biome::Forest => sea_level + 4.0 + terrain * 8.0 + detail * 3.0,
            Biome::Desert => sea_level + 1.0 + terrain * 5.0 + detail * 2.0,
            Biome::Tundra => sea_level + 4.0 + terrain * 6.0 + detail * 2.0,
            Biome::Mountains => {
                let mountain_height = (terrain + 1.0) * 0.5 * 60.0;
                sea_level + 16.0 + mountain_height + detail * 5.0
            }
        };

        (height as i32).clamp(1, CHUNK_SIZE_Y - 20)
    }

    /// Writes blocks and sea water for the given facets.
    pub fn rasterize(&self, chunk: &mut Chunk, biomes: &BiomeFacet, heights: &SurfaceHeightFacet) {
        let blocks = self.ctx.blocks().core();
        let water = LiquidData::source(LiquidType::Water);
        let sea_level = self.ctx.settings().world.sea_level.clamp(0, CHUNK_SIZE_Y);

        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                let biome = biomes.get(x, z);
                let surface = heights.get(x, z);
                let filler_top = surface - 1;
                let stone_top = filler_top - biome.filler_depth();

                for y in 0..surface {
                    let block = if y == filler_top {
                        biome.surface_block(blocks)
                    } else if y >= stone_top {
                        biome.filler_block(blocks)
                    } else {
                        blocks.stone
                    };
                    chunk.set_block(IVec3::new(x, y, z), block);
                }

                for y in surface..sea_level {
                    let pos = IVec3::new(x, y, z);
                    chunk.set_block(pos, blocks.water);
                    chunk.set_liquid(pos, water);
                }
            }
        }
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn generate_chunk(&self, chunk: &mut Chunk) {
        let biomes = self.biome_facet(chunk.position());
        let heights = self.height_facet(chunk.position(), &biomes);
        self.rasterize(chunk, &biomes, &heights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockId;

    #[test]
    fn test_flat_generator() {
        let ctx = WorldContext::with_defaults();
        let generator = FlatGenerator::with_height(ctx.clone(), 10);
        let mut chunk = Chunk::new(IVec3::ZERO);
        generator.generate_chunk(&mut chunk);

        let blocks = ctx.blocks().core();
        assert_eq!(chunk.block(IVec3::new(4, 0, 4)), blocks.stone);
        assert_eq!(chunk.block(IVec3::new(4, 9, 4)), blocks.grass);
        assert_eq!(chunk.block(IVec3::new(4, 10, 4)), BlockId::AIR);
    }

    #[test]
    fn test_terrain_generator_is_deterministic() {
        let ctx = WorldContext::with_defaults();
        let a = TerrainGenerator::new(ctx.clone());
        let b = TerrainGenerator::new(ctx.clone());
        let mut first = Chunk::new(IVec3::new(3, 0, -2));
        let mut second = Chunk::new(IVec3::new(3, 0, -2));
        a.generate_chunk(&mut first);
        b.generate_chunk(&mut second);
        assert_eq!(first.raw_blocks(), second.raw_blocks());
        assert_eq!(first.raw_liquid(), second.raw_liquid());
    }

    #[test]
    fn test_rasterizer_fills_columns_and_sea() {
        let ctx = WorldContext::with_defaults();
        let generator = TerrainGenerator::new(ctx.clone());
        let blocks = *ctx.blocks().core();
        let sea_level = ctx.settings().world.sea_level;

        let biomes = ColumnFacet::from_fn(|_, _| Biome::Ocean);
        let heights = ColumnFacet::from_fn(|x, _| if x < 8 { sea_level - 5 } else { sea_level + 5 });
        let mut chunk = Chunk::new(IVec3::ZERO);
        generator.rasterize(&mut chunk, &biomes, &heights);

        // submerged column: sand floor, water up to sea level
        assert_eq!(chunk.block(IVec3::new(2, 0, 2)), blocks.stone);
        assert_eq!(chunk.block(IVec3::new(2, sea_level - 6, 2)), blocks.sand);
        assert_eq!(chunk.block(IVec3::new(2, sea_level - 1, 2)), blocks.water);
        assert_eq!(
            chunk.liquid(IVec3::new(2, sea_level - 1, 2)),
            LiquidData::source(LiquidType::Water)
        );
        assert_eq!(chunk.block(IVec3::new(2, sea_level, 2)), BlockId::AIR);

        // dry column
        assert_eq!(chunk.block(IVec3::new(12, sea_level + 4, 2)), blocks.sand);
        assert!(chunk.liquid(IVec3::new(12, sea_level + 5, 2)).is_dry());
    }
}
