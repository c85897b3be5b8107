//! Chunk coordinates, lifecycle state, and the shared block store.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bloxel_blocks::{BlockData, BlockPos, BlockTypeId};
use bloxel_geom::{Aabb, Vec3};
use bloxel_mesh_cpu::ChunkMeshCpu;
use serde::{Deserialize, Serialize};

/// Horizontal chunk edge length in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// Vertical extent of the per-chunk culling volume. Block storage itself
/// is unbounded in Y; these only bound the frustum-culling box.
pub const CHUNK_BOUNDS_MIN_Y: f32 = -10.0;
pub const CHUNK_BOUNDS_MAX_Y: f32 = 100.0;

/// Arithmetic floor-mod: result is always in `[0, m)` for positive `m`.
/// World-to-local conversions must use this, never the `%` remainder,
/// which is sign-naive at negative coordinates.
#[inline]
pub fn floor_mod(n: i32, m: i32) -> i32 {
    n.rem_euclid(m)
}

/// Integer (cx, cz) index of a chunk column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk containing the world-space point.
    #[inline]
    pub fn from_world(wx: f32, wz: f32) -> Self {
        Self {
            cx: (wx / CHUNK_SIZE as f32).floor() as i32,
            cz: (wz / CHUNK_SIZE as f32).floor() as i32,
        }
    }

    /// Chunk containing the integer block position.
    #[inline]
    pub fn from_block(pos: BlockPos) -> Self {
        Self {
            cx: pos.x.div_euclid(CHUNK_SIZE),
            cz: pos.z.div_euclid(CHUNK_SIZE),
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn left(self) -> Self {
        self.offset(-1, 0)
    }

    #[inline]
    pub fn right(self) -> Self {
        self.offset(1, 0)
    }

    #[inline]
    pub fn front(self) -> Self {
        self.offset(0, 1)
    }

    #[inline]
    pub fn back(self) -> Self {
        self.offset(0, -1)
    }

    /// World-space X of the chunk's minimum corner.
    #[inline]
    pub fn world_x(self) -> i32 {
        self.cx * CHUNK_SIZE
    }

    /// World-space Z of the chunk's minimum corner.
    #[inline]
    pub fn world_z(self) -> i32 {
        self.cz * CHUNK_SIZE
    }
}

/// Lifecycle ladder. A chunk may regress from `Meshed` to `Generated`
/// when its mesh is invalidated (a neighbor loaded, or a boundary edit).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ChunkState {
    Empty = 0,
    Generated = 1,
    Meshed = 2,
    Active = 3,
}

impl ChunkState {
    #[inline]
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ChunkState::Generated,
            2 => ChunkState::Meshed,
            3 => ChunkState::Active,
            _ => ChunkState::Empty,
        }
    }
}

/// Unified per-chunk render mesh. `rev` increments on every rebuild so
/// embedders can cache GPU uploads keyed by (coord, rev); dropping the
/// mesh is the release signal.
#[derive(Debug)]
pub struct ChunkMesh {
    pub cpu: ChunkMeshCpu,
    pub rev: u64,
}

/// A 16x16xunbounded column of blocks keyed by local integer position.
///
/// The chunk object's identity is stable for its whole residency: the
/// manager inserts an `Arc<Chunk>` placeholder and a background worker
/// populates that same object's interior, so the block map and lifecycle
/// state live behind interior mutability. The state transition to
/// `Generated` (a release store) is the fence that publishes the worker's
/// writes to the main thread.
#[derive(Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    blocks: RwLock<HashMap<BlockPos, BlockData>>,
    state: AtomicU8,
    mesh: Mutex<Option<Arc<ChunkMesh>>>,
    bounds: Aabb,
}

impl Chunk {
    pub fn new(coord: ChunkCoord) -> Self {
        let min = Vec3::new(coord.world_x() as f32, CHUNK_BOUNDS_MIN_Y, coord.world_z() as f32);
        let max = Vec3::new(
            (coord.world_x() + CHUNK_SIZE) as f32,
            CHUNK_BOUNDS_MAX_Y,
            (coord.world_z() + CHUNK_SIZE) as f32,
        );
        Self {
            coord,
            blocks: RwLock::new(HashMap::new()),
            state: AtomicU8::new(ChunkState::Empty as u8),
            mesh: Mutex::new(None),
            bounds: Aabb::from_min_max(min, max),
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Precomputed frustum-culling volume.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_state(&self, state: ChunkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// True once terrain data is present (state at or past `Generated`).
    #[inline]
    pub fn is_generated(&self) -> bool {
        self.state() >= ChunkState::Generated
    }

    /// Publishes worker-populated block data to readers.
    pub fn mark_generated(&self) {
        self.set_state(ChunkState::Generated);
    }

    /// Inserts a block at local (x, z) and a floored world Y. Duplicate
    /// positions silently overwrite.
    pub fn add_block_local(&self, local_x: i32, world_y: f32, local_z: i32, block_type: BlockTypeId) {
        let pos = BlockPos::new(local_x, world_y.floor() as i32, local_z);
        self.blocks
            .write()
            .expect("chunk block map poisoned")
            .insert(pos, BlockData::new(pos, block_type));
    }

    pub fn get_block_local(&self, local_x: i32, world_y: f32, local_z: i32) -> Option<BlockData> {
        let pos = BlockPos::new(local_x, world_y.floor() as i32, local_z);
        self.blocks
            .read()
            .expect("chunk block map poisoned")
            .get(&pos)
            .copied()
    }

    /// Removes the block; returns whether one was present.
    pub fn remove_block_local(&self, local_x: i32, world_y: f32, local_z: i32) -> bool {
        let pos = BlockPos::new(local_x, world_y.floor() as i32, local_z);
        self.blocks
            .write()
            .expect("chunk block map poisoned")
            .remove(&pos)
            .is_some()
    }

    pub fn has_block_at_local(&self, local_x: i32, world_y: f32, local_z: i32) -> bool {
        if local_x < 0 || local_x >= CHUNK_SIZE || local_z < 0 || local_z >= CHUNK_SIZE {
            return false;
        }
        let pos = BlockPos::new(local_x, world_y.floor() as i32, local_z);
        self.blocks
            .read()
            .expect("chunk block map poisoned")
            .contains_key(&pos)
    }

    /// Inserts by world position; x/z are reduced to chunk-local with
    /// arithmetic floor-mod.
    pub fn add_block_world(&self, wx: f32, wy: f32, wz: f32, block_type: BlockTypeId) {
        let local_x = floor_mod(wx.floor() as i32, CHUNK_SIZE);
        let local_z = floor_mod(wz.floor() as i32, CHUNK_SIZE);
        self.add_block_local(local_x, wy, local_z, block_type);
    }

    /// Copy of the key set, safe to use while a worker keeps inserting.
    pub fn block_pos_snapshot(&self) -> Vec<BlockPos> {
        self.blocks
            .read()
            .expect("chunk block map poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Copy of all blocks (local positions).
    pub fn blocks_snapshot(&self) -> Vec<BlockData> {
        self.blocks
            .read()
            .expect("chunk block map poisoned")
            .values()
            .copied()
            .collect()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().expect("chunk block map poisoned").len()
    }

    /// Top of the highest block in the chunk's center column, or -1.0 when
    /// the column is empty. Used to probe a safe spawn height.
    pub fn center_height(&self) -> f32 {
        let center_x = CHUNK_SIZE / 2;
        let center_z = CHUNK_SIZE / 2;
        let guard = self.blocks.read().expect("chunk block map poisoned");
        let max_y = guard
            .keys()
            .filter(|p| p.x == center_x && p.z == center_z)
            .map(|p| p.y)
            .max();
        match max_y {
            Some(y) => y as f32 + 1.0,
            None => -1.0,
        }
    }

    /// Installs a rebuilt mesh and advances the state ladder.
    pub fn set_mesh(&self, mesh: Arc<ChunkMesh>) {
        *self.mesh.lock().expect("chunk mesh slot poisoned") = Some(mesh);
        self.set_state(ChunkState::Meshed);
    }

    /// Drops the mesh (if any) and regresses `Meshed`/`Active` back to
    /// `Generated` so the next rebuild pass picks the chunk up.
    pub fn clear_mesh(&self) {
        let mut slot = self.mesh.lock().expect("chunk mesh slot poisoned");
        if slot.take().is_some() && self.state() >= ChunkState::Meshed {
            self.set_state(ChunkState::Generated);
        }
    }

    pub fn mesh(&self) -> Option<Arc<ChunkMesh>> {
        self.mesh.lock().expect("chunk mesh slot poisoned").clone()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.lock().expect("chunk mesh slot poisoned").is_some()
    }
}
