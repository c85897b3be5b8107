use std::path::PathBuf;
use std::sync::Arc;

use bloxel_blocks::{AtlasLayout, BlockData, BlockPos, BlockTypeId};
use bloxel_chunk::{floor_mod, Chunk, ChunkCoord, ChunkMesh, ChunkState, CHUNK_SIZE};
use bloxel_geom::{Aabb, Frustum, Vec3};
use bloxel_mesh_cpu::{build_chunk_mesh, merge_visible_faces, Face, FaceMask};
use hashbrown::HashMap;

use crate::error::WorldError;
use crate::manager::ChunkManager;
use crate::policy::{ChunkGenerator, ChunkLoadPolicy};

/// One frustum-surviving chunk mesh for the render handoff. GPU residency
/// is the embedder's concern, cached by `(coord, mesh.rev)`.
pub struct ChunkRenderItem {
    pub coord: ChunkCoord,
    pub mesh: Arc<ChunkMesh>,
    pub bounds: Aabb,
}

/// World facade: block CRUD, near-block queries for physics, and the
/// mesh rebuild/culling pipeline over the chunk manager.
pub struct World {
    atlas: AtlasLayout,
    manager: Option<ChunkManager>,
    meshes_dirty: bool,
    mesh_rev: u64,
}

impl World {
    pub fn new(atlas: AtlasLayout) -> Self {
        Self {
            atlas,
            manager: None,
            meshes_dirty: true,
            mesh_rev: 0,
        }
    }

    /// Installs the chunk system with embedder-supplied terrain and
    /// residency policy.
    pub fn init_with_chunks(
        &mut self,
        world_path: impl Into<PathBuf>,
        default_block_type: BlockTypeId,
        generator: Arc<dyn ChunkGenerator>,
        policy: Box<dyn ChunkLoadPolicy>,
    ) {
        self.manager = Some(ChunkManager::new(
            world_path,
            default_block_type,
            generator,
            policy,
        ));
    }

    /// Synchronous spawn-area generation; returns the terrain height at
    /// the spawn column for player placement.
    pub fn generate_initial_chunks(
        &mut self,
        spawn_x: f32,
        spawn_z: f32,
        total_radius: i32,
        load_radius: i32,
    ) -> Result<f32, WorldError> {
        let manager = self
            .manager
            .as_mut()
            .ok_or(WorldError::ManagerNotInitialized)?;
        manager.generate_initial(spawn_x, spawn_z, total_radius, load_radius);
        self.meshes_dirty = true;
        Ok(manager.center_height(spawn_x, spawn_z))
    }

    /// Tick-rate residency update.
    pub fn update_chunks(&mut self, player_x: f32, player_z: f32) {
        if let Some(manager) = self.manager.as_mut() {
            manager.update_loaded(player_x, player_z);
            if manager.consume_chunks_changed() {
                self.meshes_dirty = true;
            }
        }
    }

    /// Per-frame drain of worker-completed chunks.
    pub fn process_pending(&mut self) {
        if let Some(manager) = self.manager.as_mut() {
            manager.process_pending();
        }
    }

    pub fn add_block(&mut self, wx: f32, wy: f32, wz: f32, block_type: BlockTypeId) {
        let Some(manager) = self.manager.as_ref() else {
            return;
        };
        manager.add_block(wx, wy, wz, block_type);
        self.invalidate_chunk_mesh(wx, wz);
        self.meshes_dirty = true;
    }

    pub fn remove_block(&mut self, wx: f32, wy: f32, wz: f32) -> bool {
        match self.manager.as_ref() {
            Some(manager) => {
                let removed = manager.remove_block(wx, wy, wz);
                if removed {
                    self.invalidate_chunk_mesh(wx, wz);
                    self.meshes_dirty = true;
                }
                removed
            }
            None => false,
        }
    }

    /// Face-culling presence query; unknown (unloaded) chunks read as
    /// solid. See [`ChunkManager::has_block_at`].
    pub fn has_block(&self, wx: f32, wy: f32, wz: f32) -> bool {
        match self.manager.as_ref() {
            Some(manager) => manager.has_block_at(wx, wy, wz),
            None => false,
        }
    }

    pub fn get_block_type(&self, wx: f32, wy: f32, wz: f32) -> Option<BlockTypeId> {
        self.manager
            .as_ref()
            .and_then(|m| m.block_at(wx, wy, wz))
            .map(|b| b.block_type)
    }

    /// Whole-world block position snapshot (world space).
    pub fn block_positions(&self) -> Vec<Vec3> {
        self.manager
            .as_ref()
            .map(|m| m.block_positions_snapshot())
            .unwrap_or_default()
    }

    /// Snapshot of block centers around (x, z) for physics.
    pub fn get_nearby_block_positions(&self, player_x: f32, player_z: f32, chunk_radius: i32) -> Vec<Vec3> {
        let mut positions = Vec::new();
        if let Some(manager) = self.manager.as_ref() {
            for chunk in manager.nearby_chunks(player_x, player_z, chunk_radius) {
                let coord = chunk.coord();
                for block in chunk.blocks_snapshot() {
                    positions.push(Vec3::new(
                        (coord.world_x() + block.pos.x) as f32,
                        block.pos.y as f32,
                        (coord.world_z() + block.pos.z) as f32,
                    ));
                }
            }
        }
        positions
    }

    pub fn chunk_coord_at(&self, wx: f32, wz: f32) -> ChunkCoord {
        ChunkCoord::from_world(wx, wz)
    }

    pub fn block_count(&self) -> usize {
        self.manager
            .as_ref()
            .map(|m| m.total_block_count())
            .unwrap_or(0)
    }

    /// Builds meshes for every generated, unmeshed chunk. Runs only when
    /// something changed since the last pass; all chunks share the pass.
    pub fn rebuild_dirty_meshes(&mut self) {
        if !self.meshes_dirty {
            return;
        }
        let Some(manager) = self.manager.as_ref() else {
            return;
        };
        let chunks: Vec<Arc<Chunk>> = manager
            .loaded_chunks()
            .filter(|c| c.is_generated() && !c.has_mesh())
            .cloned()
            .collect();
        let mut rev = self.mesh_rev;
        for chunk in &chunks {
            rev += 1;
            build_mesh_for(chunk, manager, &self.atlas, rev);
        }
        self.mesh_rev = rev;
        self.meshes_dirty = false;
    }

    /// Frustum-culled render list. Chunks whose mesh survives culling are
    /// promoted to `Active`.
    pub fn visible_meshes(&self, frustum: Option<&Frustum>) -> Vec<ChunkRenderItem> {
        let mut items = Vec::new();
        if let Some(manager) = self.manager.as_ref() {
            for chunk in manager.loaded_chunks() {
                let Some(mesh) = chunk.mesh() else { continue };
                let bounds = chunk.bounds();
                let visible = frustum
                    .map(|f| f.intersects_aabb(&bounds))
                    .unwrap_or(true);
                if visible {
                    chunk.set_state(ChunkState::Active);
                    items.push(ChunkRenderItem {
                        coord: chunk.coord(),
                        mesh,
                        bounds,
                    });
                }
            }
        }
        items
    }

    pub fn atlas(&self) -> &AtlasLayout {
        &self.atlas
    }

    pub fn chunk_manager(&self) -> Option<&ChunkManager> {
        self.manager.as_ref()
    }

    pub fn chunk_manager_mut(&mut self) -> Option<&mut ChunkManager> {
        self.manager.as_mut()
    }

    /// Tears the chunk system down (workers drained, chunks dropped).
    pub fn clear(&mut self) {
        if let Some(mut manager) = self.manager.take() {
            manager.shutdown();
        }
        self.meshes_dirty = true;
    }

    /// Drops the target chunk's mesh, plus the meshes of edge/corner
    /// neighbors when the block's local (x, z) sits on the chunk
    /// boundary: their culled faces may have changed too.
    fn invalidate_chunk_mesh(&self, wx: f32, wz: f32) {
        let coord = ChunkCoord::from_world(wx, wz);
        self.invalidate_chunk_at(coord);

        let local_x = floor_mod(wx.floor() as i32, CHUNK_SIZE);
        let local_z = floor_mod(wz.floor() as i32, CHUNK_SIZE);

        if local_x == 0 {
            self.invalidate_chunk_at(coord.left());
        } else if local_x == CHUNK_SIZE - 1 {
            self.invalidate_chunk_at(coord.right());
        }
        if local_z == 0 {
            self.invalidate_chunk_at(coord.back());
        } else if local_z == CHUNK_SIZE - 1 {
            self.invalidate_chunk_at(coord.front());
        }
        if local_x == 0 && local_z == 0 {
            self.invalidate_chunk_at(coord.offset(-1, -1));
        } else if local_x == 0 && local_z == CHUNK_SIZE - 1 {
            self.invalidate_chunk_at(coord.offset(-1, 1));
        } else if local_x == CHUNK_SIZE - 1 && local_z == 0 {
            self.invalidate_chunk_at(coord.offset(1, -1));
        } else if local_x == CHUNK_SIZE - 1 && local_z == CHUNK_SIZE - 1 {
            self.invalidate_chunk_at(coord.offset(1, 1));
        }
    }

    fn invalidate_chunk_at(&self, coord: ChunkCoord) {
        if let Some(manager) = self.manager.as_ref() {
            if let Some(chunk) = manager.get_chunk(coord) {
                if chunk.has_mesh() {
                    chunk.clear_mesh();
                }
            }
        }
    }
}

/// Face culling + greedy merge + atlas-safe emission for one chunk.
/// A block's face is visible iff the neighbor cell reports empty; blocks
/// with all six faces hidden are dropped from the mesh entirely.
fn build_mesh_for(chunk: &Chunk, manager: &ChunkManager, atlas: &AtlasLayout, rev: u64) {
    let coord = chunk.coord();
    let blocks = chunk.blocks_snapshot();
    let mut visible_blocks: Vec<BlockData> = Vec::with_capacity(blocks.len());
    let mut masks: HashMap<BlockPos, FaceMask> = HashMap::with_capacity(blocks.len());

    for block in blocks {
        let world = BlockPos::new(
            coord.world_x() + block.pos.x,
            block.pos.y,
            coord.world_z() + block.pos.z,
        );
        let mut mask = [false; 6];
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            mask[face.index()] = !manager.has_block_at(
                (world.x + dx) as f32,
                (world.y + dy) as f32,
                (world.z + dz) as f32,
            );
        }
        if mask.iter().any(|v| *v) {
            visible_blocks.push(BlockData::new(world, block.block_type));
            masks.insert(world, mask);
        }
    }

    let quads = merge_visible_faces(&visible_blocks, &masks);
    let cpu = build_chunk_mesh(&quads, atlas);
    chunk.set_mesh(Arc::new(ChunkMesh { cpu, rev }));
}
