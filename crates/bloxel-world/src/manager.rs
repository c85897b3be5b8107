use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bloxel_blocks::{BlockData, BlockTypeId};
use bloxel_chunk::{floor_mod, Chunk, ChunkCoord, ChunkState, CHUNK_SIZE};
use bloxel_geom::Vec3;

use crate::error::WorldError;
use crate::policy::{ChunkGenerator, ChunkLoadPolicy};
use crate::serializer::ChunkSerializer;

/// Generation/disk workers. Two is intentional: chunk jobs are short and
/// the main thread never waits on them.
pub const WORKER_COUNT: usize = 2;

/// Completed chunks published to the main thread per drain call.
pub const MAX_PENDING_PER_FRAME: usize = 4;

/// Extra chunks removed beyond the limit on each eviction to reduce churn.
pub const EVICTION_OVERSHOOT: usize = 10;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum ChunkJob {
    LoadOrGenerate { chunk: Arc<Chunk> },
    Pregenerate { coord: ChunkCoord },
}

/// Decides chunk residency, drives asynchronous generation and disk I/O,
/// and publishes completed chunks back to the main thread.
///
/// Threading: the manager itself lives on the main thread and owns every
/// map the renderer observes. Workers only ever see the `Arc<Chunk>` they
/// were handed (the placeholder already in `loaded`), the shared `loading`
/// guard set, and the pending channel.
pub struct ChunkManager {
    world_path: PathBuf,
    default_block_type: BlockTypeId,
    generator: Arc<dyn ChunkGenerator>,
    policy: Box<dyn ChunkLoadPolicy>,

    loaded: HashMap<ChunkCoord, Arc<Chunk>>,
    access_time: HashMap<ChunkCoord, Instant>,
    loading: Arc<Mutex<HashSet<ChunkCoord>>>,

    job_tx: Option<mpsc::Sender<ChunkJob>>,
    pending_rx: mpsc::Receiver<Arc<Chunk>>,
    dispatcher: Option<thread::JoinHandle<()>>,
    workers: Vec<thread::JoinHandle<()>>,

    last_player_chunk: Option<ChunkCoord>,
    chunks_changed: bool,
}

impl ChunkManager {
    pub fn new(
        world_path: impl Into<PathBuf>,
        default_block_type: BlockTypeId,
        generator: Arc<dyn ChunkGenerator>,
        policy: Box<dyn ChunkLoadPolicy>,
    ) -> Self {
        let world_path = world_path.into();
        if let Err(err) = std::fs::create_dir_all(world_path.join("chunks")) {
            log::warn!("failed to create chunk dir under {}: {err}", world_path.display());
        }

        let loading: Arc<Mutex<HashSet<ChunkCoord>>> = Arc::new(Mutex::new(HashSet::new()));
        let (job_tx, job_rx) = mpsc::channel::<ChunkJob>();
        let (pending_tx, pending_rx) = mpsc::channel::<Arc<Chunk>>();

        // Per-worker channels fed by a round-robin dispatcher thread.
        let mut worker_txs: Vec<mpsc::Sender<ChunkJob>> = Vec::with_capacity(WORKER_COUNT);
        let mut workers = Vec::with_capacity(WORKER_COUNT);
        for _ in 0..WORKER_COUNT {
            let (wtx, wrx) = mpsc::channel::<ChunkJob>();
            worker_txs.push(wtx);
            let pending = pending_tx.clone();
            let generator = generator.clone();
            let loading = loading.clone();
            let world_path = world_path.clone();
            workers.push(thread::spawn(move || {
                while let Ok(job) = wrx.recv() {
                    run_job(job, &world_path, default_block_type, &*generator, &loading, &pending);
                }
            }));
        }
        let dispatcher = thread::spawn(move || {
            let mut i = 0usize;
            while let Ok(job) = job_rx.recv() {
                if !worker_txs.is_empty() {
                    let _ = worker_txs[i % worker_txs.len()].send(job);
                    i = i.wrapping_add(1);
                }
            }
        });

        Self {
            world_path,
            default_block_type,
            generator,
            policy,
            loaded: HashMap::new(),
            access_time: HashMap::new(),
            loading,
            job_tx: Some(job_tx),
            pending_rx,
            dispatcher: Some(dispatcher),
            workers,
            last_player_chunk: None,
            chunks_changed: false,
        }
    }

    /// Residency update; call at the chunk tick rate. Does the full
    /// policy sweep only when the player crossed a chunk boundary,
    /// otherwise just drains pending completions.
    pub fn update_loaded(&mut self, player_x: f32, player_z: f32) {
        let player_chunk = ChunkCoord::from_world(player_x, player_z);
        if self.last_player_chunk == Some(player_chunk) {
            self.process_pending();
            return;
        }
        self.last_player_chunk = Some(player_chunk);

        let mut required: HashSet<ChunkCoord> = HashSet::new();
        let search_radius = ((self.policy.max_loaded_chunks() / 10) as i32).max(10);
        for dx in -search_radius..=search_radius {
            for dz in -search_radius..=search_radius {
                let coord = player_chunk.offset(dx, dz);
                if self
                    .policy
                    .should_load_to_memory(coord.cx, coord.cz, player_chunk.cx, player_chunk.cz)
                {
                    required.insert(coord);
                    let resident = self
                        .loaded
                        .get(&coord)
                        .map(|c| c.is_generated())
                        .unwrap_or(false);
                    if resident {
                        self.access_time.insert(coord, Instant::now());
                    } else {
                        self.load_or_generate_async(coord);
                    }
                } else if self
                    .policy
                    .should_pregenerate(coord.cx, coord.cz, player_chunk.cx, player_chunk.cz)
                    && !ChunkSerializer::chunk_file_exists(&self.world_path, coord)
                {
                    self.submit(ChunkJob::Pregenerate { coord });
                }
            }
        }

        if self.loaded.len() > self.policy.max_loaded_chunks() {
            self.unload_old(&required);
        }

        self.process_pending();
    }

    /// Starts an async load-or-generate for the coordinate. The placeholder
    /// inserted here is the exact object the worker populates; it is never
    /// replaced for the rest of its residency.
    fn load_or_generate_async(&mut self, coord: ChunkCoord) {
        {
            let mut loading = self.loading.lock().expect("loading set poisoned");
            if loading.contains(&coord) {
                return;
            }
            loading.insert(coord);
        }
        let chunk = self
            .loaded
            .entry(coord)
            .or_insert_with(|| Arc::new(Chunk::new(coord)))
            .clone();
        self.submit(ChunkJob::LoadOrGenerate { chunk });
    }

    fn submit(&self, job: ChunkJob) {
        if let Some(tx) = &self.job_tx {
            if tx.send(job).is_err() {
                log::error!("chunk job channel closed; dropping job");
            }
        }
    }

    /// Publishes worker-completed chunks, at most [`MAX_PENDING_PER_FRAME`]
    /// per call so a burst of completions cannot stall a frame. Neighbor
    /// meshes are invalidated afterwards: their boundary faces may now be
    /// culled or newly uncovered.
    pub fn process_pending(&mut self) {
        let drained: Vec<Arc<Chunk>> = self
            .pending_rx
            .try_iter()
            .take(MAX_PENDING_PER_FRAME)
            .collect();
        if drained.is_empty() {
            return;
        }
        let mut completed = Vec::with_capacity(drained.len());
        for chunk in drained {
            let coord = chunk.coord();
            self.loading.lock().expect("loading set poisoned").remove(&coord);
            self.access_time.insert(coord, Instant::now());
            self.chunks_changed = true;
            completed.push(coord);
        }
        for coord in completed {
            self.invalidate_adjacent_meshes(coord);
        }
    }

    fn invalidate_adjacent_meshes(&mut self, center: ChunkCoord) {
        for adjacent in [center.left(), center.right(), center.front(), center.back()] {
            if let Some(chunk) = self.loaded.get(&adjacent) {
                if chunk.is_generated() && chunk.has_mesh() {
                    chunk.clear_mesh();
                    self.chunks_changed = true;
                }
            }
        }
    }

    /// LRU eviction sparing the required set; persists each evicted chunk
    /// best-effort before dropping it.
    fn unload_old(&mut self, protected: &HashSet<ChunkCoord>) {
        let mut by_age: Vec<(ChunkCoord, Instant)> =
            self.access_time.iter().map(|(c, t)| (*c, *t)).collect();
        by_age.sort_by_key(|(_, t)| *t);

        let to_remove = self
            .loaded
            .len()
            .saturating_sub(self.policy.max_loaded_chunks())
            + EVICTION_OVERSHOOT;
        let mut removed = 0usize;
        for (coord, _) in by_age {
            if removed >= to_remove {
                break;
            }
            if protected.contains(&coord) {
                continue;
            }
            if let Some(chunk) = self.loaded.get(&coord) {
                if chunk.is_generated() {
                    let file = ChunkSerializer::chunk_file(&self.world_path, coord);
                    if let Err(err) = ChunkSerializer::save(chunk, &file) {
                        log::warn!("failed to save chunk ({}, {}): {err}", coord.cx, coord.cz);
                    }
                }
            }
            self.loaded.remove(&coord);
            self.access_time.remove(&coord);
            self.chunks_changed = true;
            removed += 1;
        }
        if removed > 0 {
            log::debug!("evicted {removed} chunks ({} still loaded)", self.loaded.len());
        }
    }

    /// Synchronous spawn-area generation: files out to `total_radius`,
    /// memory residency out to `load_radius`.
    pub fn generate_initial(
        &mut self,
        center_x: f32,
        center_z: f32,
        total_radius: i32,
        load_radius: i32,
    ) {
        let center = ChunkCoord::from_world(center_x, center_z);
        let mut generated = 0usize;
        let mut loaded = 0usize;

        for dx in -total_radius..=total_radius {
            for dz in -total_radius..=total_radius {
                let coord = center.offset(dx, dz);
                let file = ChunkSerializer::chunk_file(&self.world_path, coord);
                if file.exists() {
                    continue;
                }
                let chunk = Chunk::new(coord);
                self.generator.generate(&chunk, self.default_block_type);
                match ChunkSerializer::save(&chunk, &file) {
                    Ok(()) => generated += 1,
                    Err(err) => {
                        log::error!("failed to write chunk ({}, {}): {err}", coord.cx, coord.cz)
                    }
                }
            }
        }

        for dx in -load_radius..=load_radius {
            for dz in -load_radius..=load_radius {
                let coord = center.offset(dx, dz);
                let file = ChunkSerializer::chunk_file(&self.world_path, coord);
                let chunk = match ChunkSerializer::load_new(&file) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        log::warn!(
                            "initial load of chunk ({}, {}) failed ({err}); regenerating",
                            coord.cx,
                            coord.cz
                        );
                        let chunk = Chunk::new(coord);
                        self.generator.generate(&chunk, self.default_block_type);
                        chunk.mark_generated();
                        chunk
                    }
                };
                self.loaded.insert(coord, Arc::new(chunk));
                self.access_time.insert(coord, Instant::now());
                loaded += 1;
            }
        }

        self.chunks_changed = true;
        log::info!("initial chunks: {generated} generated to disk, {loaded} loaded");
    }

    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&Arc<Chunk>> {
        self.loaded.get(&coord)
    }

    /// Block lookup by world position; `None` when the chunk is absent,
    /// not yet generated, or the cell is empty.
    pub fn block_at(&self, wx: f32, wy: f32, wz: f32) -> Option<BlockData> {
        let coord = ChunkCoord::from_world(wx, wz);
        let chunk = self.loaded.get(&coord)?;
        if !chunk.is_generated() {
            return None;
        }
        let local_x = floor_mod(wx.floor() as i32, CHUNK_SIZE);
        let local_z = floor_mod(wz.floor() as i32, CHUNK_SIZE);
        chunk.get_block_local(local_x, wy, local_z)
    }

    /// Face-culling query. A position inside a chunk that is not loaded
    /// (or not yet generated) reports **solid** so no faces are emitted at
    /// the streaming edge; the adjacent-mesh invalidation on chunk
    /// completion re-exposes those faces once the neighbor exists.
    pub fn has_block_at(&self, wx: f32, wy: f32, wz: f32) -> bool {
        let coord = ChunkCoord::from_world(wx, wz);
        match self.loaded.get(&coord) {
            Some(chunk) if chunk.is_generated() => {
                let local_x = floor_mod(wx.floor() as i32, CHUNK_SIZE);
                let local_z = floor_mod(wz.floor() as i32, CHUNK_SIZE);
                chunk.has_block_at_local(local_x, wy, local_z)
            }
            _ => true,
        }
    }

    /// Inserts into the owning chunk; a no-op when that chunk is not
    /// resident and generated.
    pub fn add_block(&self, wx: f32, wy: f32, wz: f32, block_type: BlockTypeId) {
        let coord = ChunkCoord::from_world(wx, wz);
        if let Some(chunk) = self.loaded.get(&coord) {
            if chunk.is_generated() {
                chunk.add_block_world(wx, wy, wz, block_type);
            }
        }
    }

    pub fn remove_block(&self, wx: f32, wy: f32, wz: f32) -> bool {
        let coord = ChunkCoord::from_world(wx, wz);
        match self.loaded.get(&coord) {
            Some(chunk) if chunk.is_generated() => {
                let local_x = floor_mod(wx.floor() as i32, CHUNK_SIZE);
                let local_z = floor_mod(wz.floor() as i32, CHUNK_SIZE);
                chunk.remove_block_local(local_x, wy, local_z)
            }
            _ => false,
        }
    }

    /// World-space positions of every block in every generated chunk.
    /// A copy: background workers may keep inserting while the caller
    /// iterates.
    pub fn block_positions_snapshot(&self) -> Vec<Vec3> {
        let mut snapshot = Vec::new();
        for chunk in self.loaded.values() {
            if !chunk.is_generated() {
                continue;
            }
            let coord = chunk.coord();
            for pos in chunk.block_pos_snapshot() {
                snapshot.push(Vec3::new(
                    (coord.world_x() + pos.x) as f32,
                    pos.y as f32,
                    (coord.world_z() + pos.z) as f32,
                ));
            }
        }
        snapshot
    }

    /// Generated chunks within a square chunk radius (1 = 3x3).
    pub fn nearby_chunks(&self, wx: f32, wz: f32, radius: i32) -> Vec<Arc<Chunk>> {
        let center = ChunkCoord::from_world(wx, wz);
        let mut out = Vec::new();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if let Some(chunk) = self.loaded.get(&center.offset(dx, dz)) {
                    if chunk.is_generated() {
                        out.push(chunk.clone());
                    }
                }
            }
        }
        out
    }

    pub fn center_height(&self, wx: f32, wz: f32) -> f32 {
        let coord = ChunkCoord::from_world(wx, wz);
        match self.loaded.get(&coord) {
            Some(chunk) if chunk.is_generated() => chunk.center_height(),
            _ => 0.0,
        }
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = &Arc<Chunk>> {
        self.loaded.values()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        self.loaded.keys().copied().collect()
    }

    pub fn loading_count(&self) -> usize {
        self.loading.lock().expect("loading set poisoned").len()
    }

    pub fn total_block_count(&self) -> usize {
        self.loaded
            .values()
            .filter(|c| c.is_generated())
            .map(|c| c.block_count())
            .sum()
    }

    /// True once since the last call if residency or meshes changed.
    pub fn consume_chunks_changed(&mut self) -> bool {
        let changed = self.chunks_changed;
        self.chunks_changed = false;
        changed
    }

    pub fn world_path(&self) -> &Path {
        &self.world_path
    }

    /// Stops accepting work, then waits up to five seconds for in-flight
    /// jobs before detaching the workers. Tasks are single-chunk, so the
    /// drain is normally immediate.
    pub fn shutdown(&mut self) {
        self.job_tx.take();
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
        let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
        for handle in std::mem::take(&mut self.workers) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                log::warn!("chunk worker still busy after {SHUTDOWN_TIMEOUT:?}; detaching");
            }
        }
    }
}

impl Drop for ChunkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job(
    job: ChunkJob,
    world_path: &Path,
    default_block_type: BlockTypeId,
    generator: &dyn ChunkGenerator,
    loading: &Mutex<HashSet<ChunkCoord>>,
    pending: &mpsc::Sender<Arc<Chunk>>,
) {
    match job {
        ChunkJob::LoadOrGenerate { chunk } => {
            let coord = chunk.coord();
            match load_or_generate(&chunk, world_path, default_block_type, generator) {
                Ok(()) => {
                    let _ = pending.send(chunk);
                }
                Err(err) => {
                    // Placeholder stays Empty; the next boundary crossing
                    // resubmits it.
                    log::error!("chunk ({}, {}) load failed: {err}", coord.cx, coord.cz);
                    chunk.set_state(ChunkState::Empty);
                    loading.lock().expect("loading set poisoned").remove(&coord);
                }
            }
        }
        ChunkJob::Pregenerate { coord } => {
            if ChunkSerializer::chunk_file_exists(world_path, coord) {
                return;
            }
            let chunk = Chunk::new(coord);
            generator.generate(&chunk, default_block_type);
            let file = ChunkSerializer::chunk_file(world_path, coord);
            if let Err(err) = ChunkSerializer::save(&chunk, &file) {
                log::warn!("pregeneration of chunk ({}, {}) failed: {err}", coord.cx, coord.cz);
            }
        }
    }
}

fn load_or_generate(
    chunk: &Chunk,
    world_path: &Path,
    default_block_type: BlockTypeId,
    generator: &dyn ChunkGenerator,
) -> Result<(), WorldError> {
    let coord = chunk.coord();
    let file = ChunkSerializer::chunk_file(world_path, coord);
    if file.exists() {
        match ChunkSerializer::load_into(chunk, &file) {
            Ok(()) => return Ok(()),
            // A mismatched header is fatal for this read; do not guess.
            Err(err @ WorldError::HeaderMismatch { .. }) => return Err(err),
            Err(err) => {
                log::warn!(
                    "chunk ({}, {}) read failed ({err}); regenerating",
                    coord.cx,
                    coord.cz
                );
                generator.generate(chunk, default_block_type);
                chunk.mark_generated();
                if let Err(save_err) = ChunkSerializer::save(chunk, &file) {
                    log::warn!(
                        "rewrite of chunk ({}, {}) failed: {save_err}",
                        coord.cx,
                        coord.cz
                    );
                }
            }
        }
    } else {
        generator.generate(chunk, default_block_type);
        chunk.mark_generated();
    }
    Ok(())
}
