use bloxel_blocks::BlockTypeId;
use bloxel_chunk::Chunk;

/// Terrain source, called from worker threads. Implementations must be
/// thread-safe and write only through the chunk handed to them.
pub trait ChunkGenerator: Send + Sync {
    fn generate(&self, chunk: &Chunk, default_block_type: BlockTypeId);
}

/// Residency policy: which chunks live in memory, which only get their
/// file pregenerated, and how many may stay resident.
pub trait ChunkLoadPolicy: Send {
    fn should_load_to_memory(&self, cx: i32, cz: i32, player_cx: i32, player_cz: i32) -> bool;
    fn should_pregenerate(&self, cx: i32, cz: i32, player_cx: i32, player_cz: i32) -> bool;
    fn max_loaded_chunks(&self) -> usize;
}

/// Square (Chebyshev) radius policy: load within `load_radius`,
/// pregenerate files out to `pregen_radius`.
#[derive(Clone, Copy, Debug)]
pub struct RadiusLoadPolicy {
    pub load_radius: i32,
    pub pregen_radius: i32,
    pub max_loaded: usize,
}

impl RadiusLoadPolicy {
    pub fn new(load_radius: i32, pregen_radius: i32, max_loaded: usize) -> Self {
        Self {
            load_radius,
            pregen_radius,
            max_loaded,
        }
    }
}

#[inline]
fn chebyshev(cx: i32, cz: i32, px: i32, pz: i32) -> i32 {
    (cx - px).abs().max((cz - pz).abs())
}

impl ChunkLoadPolicy for RadiusLoadPolicy {
    fn should_load_to_memory(&self, cx: i32, cz: i32, player_cx: i32, player_cz: i32) -> bool {
        chebyshev(cx, cz, player_cx, player_cz) <= self.load_radius
    }

    fn should_pregenerate(&self, cx: i32, cz: i32, player_cx: i32, player_cz: i32) -> bool {
        chebyshev(cx, cz, player_cx, player_cz) <= self.pregen_radius
    }

    fn max_loaded_chunks(&self) -> usize {
        self.max_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_policy_is_a_square() {
        let policy = RadiusLoadPolicy::new(2, 4, 100);
        assert!(policy.should_load_to_memory(2, -2, 0, 0));
        assert!(!policy.should_load_to_memory(3, 0, 0, 0));
        // Relative to the player chunk, not the origin
        assert!(policy.should_load_to_memory(12, 10, 10, 10));

        assert!(policy.should_pregenerate(4, 4, 0, 0));
        assert!(!policy.should_pregenerate(5, 0, 0, 0));
        assert_eq!(policy.max_loaded_chunks(), 100);
    }

    #[test]
    fn negative_pregen_radius_disables_pregeneration() {
        let policy = RadiusLoadPolicy::new(1, -1, 10);
        assert!(!policy.should_pregenerate(0, 0, 0, 0));
    }
}
