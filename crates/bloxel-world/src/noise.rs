use fastnoise_lite::{FastNoiseLite, NoiseType};

/// Seeded 2-D terrain noise in [-1, 1]. A convenience for embedder
/// generators; the engine itself never samples it.
pub struct TerrainNoise {
    noise: FastNoiseLite,
}

impl TerrainNoise {
    pub fn new(seed: i32) -> Self {
        Self::with_frequency(seed, 0.01)
    }

    pub fn with_frequency(seed: i32, frequency: f32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        Self { noise }
    }

    #[inline]
    pub fn sample2(&self, x: f32, z: f32) -> f32 {
        self.noise.get_noise_2d(x, z)
    }
}
