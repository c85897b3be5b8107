use bloxel_blocks::BlockTypeId;
use bloxel_chunk::{Chunk, CHUNK_SIZE};

use crate::noise::TerrainNoise;
use crate::policy::ChunkGenerator;

/// Column-fill terrain from 2-D noise: every column is solid from y = 0
/// up to a noise-picked height. A ready-made [`ChunkGenerator`] for
/// embedders that do not bring their own.
pub struct NoiseHeightGenerator {
    noise: TerrainNoise,
    base_height: i32,
    amplitude: i32,
}

impl NoiseHeightGenerator {
    pub fn new(seed: i32) -> Self {
        Self::with_shape(seed, 4, 12)
    }

    pub fn with_shape(seed: i32, base_height: i32, amplitude: i32) -> Self {
        Self {
            noise: TerrainNoise::new(seed),
            base_height: base_height.max(1),
            amplitude: amplitude.max(0),
        }
    }

    /// Terrain height (solid blocks above y = 0) for a world column.
    pub fn height_at(&self, wx: i32, wz: i32) -> i32 {
        let sample = self.noise.sample2(wx as f32, wz as f32);
        let lift = ((sample + 1.0) * 0.5 * self.amplitude as f32) as i32;
        (self.base_height + lift).max(1)
    }
}

impl ChunkGenerator for NoiseHeightGenerator {
    fn generate(&self, chunk: &Chunk, default_block_type: BlockTypeId) {
        let coord = chunk.coord();
        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let height = self.height_at(coord.world_x() + lx, coord.world_z() + lz);
                for y in 0..height {
                    chunk.add_block_local(lx, y as f32, lz, default_block_type);
                }
            }
        }
    }
}
