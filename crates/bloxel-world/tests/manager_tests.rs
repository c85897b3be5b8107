use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bloxel_blocks::BlockTypeId;
use bloxel_chunk::{Chunk, ChunkCoord, CHUNK_SIZE};
use bloxel_world::{
    ChunkGenerator, ChunkManager, ChunkSerializer, RadiusLoadPolicy, MAX_PENDING_PER_FRAME,
};

static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

fn temp_world_path(tag: &str) -> std::path::PathBuf {
    let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("bloxel-manager-{tag}-{}-{seq}", std::process::id()))
}

/// Fills y = 0 across the chunk and records which coordinates were
/// generated.
struct FlatGenerator {
    calls: Mutex<Vec<ChunkCoord>>,
}

impl FlatGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls_for(&self, coord: ChunkCoord) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == coord)
            .count()
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate(&self, chunk: &Chunk, default_block_type: BlockTypeId) {
        self.calls.lock().unwrap().push(chunk.coord());
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                chunk.add_block_local(x, 0.0, z, default_block_type);
            }
        }
    }
}

/// Blocks every generate call until the test sends a permit; dropping the
/// sender releases all waiters.
struct GatedGenerator {
    inner: Arc<FlatGenerator>,
    gate: Mutex<Receiver<()>>,
}

impl GatedGenerator {
    fn new() -> (Arc<Self>, Sender<()>, Arc<FlatGenerator>) {
        let (tx, rx) = mpsc::channel();
        let inner = FlatGenerator::new();
        (
            Arc::new(Self {
                inner: inner.clone(),
                gate: Mutex::new(rx),
            }),
            tx,
            inner,
        )
    }
}

impl ChunkGenerator for GatedGenerator {
    fn generate(&self, chunk: &Chunk, default_block_type: BlockTypeId) {
        // Err means the test finished and dropped the sender; proceed.
        let _ = self.gate.lock().unwrap().recv();
        self.inner.generate(chunk, default_block_type);
    }
}

fn drain_until_generated(
    manager: &mut ChunkManager,
    coord: ChunkCoord,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        manager.process_pending();
        if let Some(chunk) = manager.get_chunk(coord) {
            if chunk.is_generated() && manager.loading_count() == 0 {
                return true;
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn placeholder_identity_survives_async_load() {
    let world_path = temp_world_path("placeholder");
    let (generator, gate, calls) = GatedGenerator::new();
    let mut manager = ChunkManager::new(
        &world_path,
        0,
        generator,
        Box::new(RadiusLoadPolicy::new(0, -1, 64)),
    );

    let origin = ChunkCoord::new(0, 0);
    manager.update_loaded(0.0, 0.0);
    let placeholder = manager.get_chunk(origin).expect("placeholder inserted").clone();
    assert!(!placeholder.is_generated());
    assert_eq!(manager.loading_count(), 1);

    // Re-entering the residency update while the job is in flight must
    // neither submit a second job nor replace the placeholder.
    manager.update_loaded(CHUNK_SIZE as f32 + 1.0, 0.0);
    manager.update_loaded(0.0, 0.0);
    let still = manager.get_chunk(origin).expect("still resident").clone();
    assert!(Arc::ptr_eq(&placeholder, &still));

    // Release the gate: one permit per submitted job.
    gate.send(()).unwrap();
    gate.send(()).unwrap();
    assert!(drain_until_generated(&mut manager, origin, Duration::from_secs(5)));

    // The published chunk is identity-equal to the first placeholder and
    // was generated exactly once.
    let done = manager.get_chunk(origin).expect("loaded").clone();
    assert!(Arc::ptr_eq(&placeholder, &done));
    assert_eq!(calls.calls_for(origin), 1);

    drop(gate);
    manager.shutdown();
    std::fs::remove_dir_all(&world_path).ok();
}

#[test]
fn pending_drain_is_bounded_per_call() {
    let world_path = temp_world_path("draincap");
    let (generator, gate, calls) = GatedGenerator::new();
    let mut manager = ChunkManager::new(
        &world_path,
        0,
        generator,
        Box::new(RadiusLoadPolicy::new(1, -1, 64)),
    );

    // 3x3 jobs; the gate holds every worker so nothing completes early
    manager.update_loaded(0.0, 0.0);
    assert_eq!(manager.loading_count(), 9);

    for _ in 0..9 {
        gate.send(()).unwrap();
    }
    let deadline = Instant::now() + Duration::from_secs(5);
    while calls.calls.lock().unwrap().len() < 9 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(calls.calls.lock().unwrap().len(), 9);
    std::thread::sleep(Duration::from_millis(50));

    // One drain publishes at most MAX_PENDING_PER_FRAME chunks
    manager.process_pending();
    assert!(manager.loading_count() >= 9 - MAX_PENDING_PER_FRAME);

    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.loading_count() > 0 && Instant::now() < deadline {
        manager.process_pending();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(manager.loading_count(), 0);

    manager.shutdown();
    std::fs::remove_dir_all(&world_path).ok();
}

#[test]
fn residency_update_is_idempotent() {
    let world_path = temp_world_path("idempotent");
    let generator = FlatGenerator::new();
    let mut manager = ChunkManager::new(
        &world_path,
        0,
        generator.clone(),
        Box::new(RadiusLoadPolicy::new(1, -1, 64)),
    );

    manager.update_loaded(0.0, 0.0);
    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.loading_count() > 0 && Instant::now() < deadline {
        manager.process_pending();
        std::thread::sleep(Duration::from_millis(5));
    }
    let mut first: Vec<ChunkCoord> = manager.loaded_coords();
    first.sort_by_key(|c| (c.cx, c.cz));
    let calls_after_first = generator.calls.lock().unwrap().len();

    // Same player position again: identical loaded set, no new jobs
    manager.update_loaded(0.0, 0.0);
    manager.update_loaded(0.0, 0.0);
    let mut second: Vec<ChunkCoord> = manager.loaded_coords();
    second.sort_by_key(|c| (c.cx, c.cz));
    assert_eq!(first, second);
    assert_eq!(generator.calls.lock().unwrap().len(), calls_after_first);
    assert_eq!(manager.loading_count(), 0);

    manager.shutdown();
    std::fs::remove_dir_all(&world_path).ok();
}

#[test]
fn eviction_spares_required_chunks_and_persists_the_rest() {
    let world_path = temp_world_path("eviction");
    let generator = FlatGenerator::new();
    let mut manager = ChunkManager::new(
        &world_path,
        0,
        generator,
        Box::new(RadiusLoadPolicy::new(1, -1, 9)),
    );

    // Synchronously fill a 5x5 area into memory, far above the limit of 9
    manager.generate_initial(0.0, 0.0, 2, 2);
    assert_eq!(manager.loaded_count(), 25);

    manager.update_loaded(0.0, 0.0);

    // Required 3x3 survives; everything else was evicted and saved
    let mut remaining = manager.loaded_coords();
    remaining.sort_by_key(|c| (c.cx, c.cz));
    let mut expected = Vec::new();
    for dx in -1..=1 {
        for dz in -1..=1 {
            expected.push(ChunkCoord::new(dx, dz));
        }
    }
    expected.sort_by_key(|c| (c.cx, c.cz));
    assert_eq!(remaining, expected);

    for coord in [ChunkCoord::new(2, 2), ChunkCoord::new(-2, 0), ChunkCoord::new(0, -2)] {
        assert!(ChunkSerializer::chunk_file_exists(&world_path, coord));
    }

    manager.shutdown();
    std::fs::remove_dir_all(&world_path).ok();
}

#[test]
fn completed_chunk_invalidates_neighbor_meshes() {
    let world_path = temp_world_path("invalidate");
    let generator = FlatGenerator::new();
    let mut manager = ChunkManager::new(
        &world_path,
        0,
        generator,
        Box::new(RadiusLoadPolicy::new(0, -1, 64)),
    );

    // Start with a generated, meshed chunk at the origin
    manager.generate_initial(0.0, 0.0, 0, 0);
    let origin = manager.get_chunk(ChunkCoord::new(0, 0)).unwrap().clone();
    origin.set_mesh(Arc::new(bloxel_chunk::ChunkMesh {
        cpu: bloxel_mesh_cpu::build_chunk_mesh(&[], &bloxel_blocks::AtlasLayout::default()),
        rev: 1,
    }));
    assert!(origin.has_mesh());
    manager.consume_chunks_changed();

    // Stream in the +X neighbor; draining it must drop the origin's mesh
    manager.update_loaded(CHUNK_SIZE as f32 + 1.0, 0.0);
    let neighbor = ChunkCoord::new(1, 0);
    assert!(drain_until_generated(&mut manager, neighbor, Duration::from_secs(5)));
    assert!(!origin.has_mesh());
    assert!(manager.consume_chunks_changed());

    manager.shutdown();
    std::fs::remove_dir_all(&world_path).ok();
}
