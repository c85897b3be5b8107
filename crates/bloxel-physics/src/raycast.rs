use bloxel_blocks::BlockPos;
use bloxel_geom::Vec3;
use bloxel_world::World;

pub const RAY_MAX_DISTANCE: f32 = 10.0;
pub const RAY_STEP: f32 = 0.05;

/// A raycast hit: the block entered and the unit normal of the face the
/// ray came through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaycastHit {
    pub block_pos: BlockPos,
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
}

impl RaycastHit {
    /// Cell a new block would occupy if placed against the hit face.
    #[inline]
    pub fn placement_pos(&self) -> BlockPos {
        self.block_pos.offset(self.nx, self.ny, self.nz)
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        Vec3::new(self.nx as f32, self.ny as f32, self.nz as f32)
    }
}

/// Short stepped raycast for crosshair block selection.
///
/// Marches `RAY_STEP`-sized samples (deliberately smaller than a block so
/// grazing hits register) out to [`RAY_MAX_DISTANCE`]. Each sample is
/// resolved to its candidate cell by rounding to the nearest block center
/// and answered with a chunk-local lookup. The face normal comes from the
/// entry point: the axis of maximum displacement from the block center,
/// signed by that component.
pub fn raycast(world: &World, origin: Vec3, dir: Vec3) -> Option<RaycastHit> {
    let len = dir.length();
    if len < 1e-6 {
        return None;
    }
    let step = dir / len * RAY_STEP;

    let mut current = origin;
    let mut previous = origin;
    let mut distance = 0.0f32;
    while distance < RAY_MAX_DISTANCE {
        previous = current;
        current += step;
        distance += RAY_STEP;

        // Blocks are centered on integer coordinates with bounds
        // [c - 0.5, c + 0.5], so the containing cell is the rounded point.
        let bx = current.x.round() as i32;
        let by = current.y.round() as i32;
        let bz = current.z.round() as i32;
        if world
            .get_block_type(bx as f32, by as f32, bz as f32)
            .is_some()
        {
            let (nx, ny, nz) = hit_normal(previous, bx, by, bz);
            return Some(RaycastHit {
                block_pos: BlockPos::new(bx, by, bz),
                nx,
                ny,
                nz,
            });
        }
    }
    None
}

/// Classifies the entered face from the last sample outside the block.
fn hit_normal(entry: Vec3, bx: i32, by: i32, bz: i32) -> (i32, i32, i32) {
    let dx = entry.x - bx as f32;
    let dy = entry.y - by as f32;
    let dz = entry.z - bz as f32;
    let (ax, ay, az) = (dx.abs(), dy.abs(), dz.abs());

    if ax > ay && ax > az {
        (if dx > 0.0 { 1 } else { -1 }, 0, 0)
    } else if ay > az {
        (0, if dy > 0.0 { 1 } else { -1 }, 0)
    } else {
        (0, 0, if dz > 0.0 { 1 } else { -1 })
    }
}
