use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bloxel::blocks::BlockTypeId;
use bloxel::chunk::{Chunk, CHUNK_SIZE};
use bloxel::geom::Vec3;
use bloxel::physics::{Player, PhysicsStepper};
use bloxel::world::{ChunkGenerator, ChunkRenderItem, RadiusLoadPolicy, World};
use bloxel::{CameraDriver, Engine, EngineConfig, EngineError, RenderSink};
use bloxel::physics::RaycastHit;

static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

fn temp_world_path(tag: &str) -> std::path::PathBuf {
    let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("bloxel-engine-{tag}-{}-{seq}", std::process::id()))
}

struct FlatGenerator;

impl ChunkGenerator for FlatGenerator {
    fn generate(&self, chunk: &Chunk, default_block_type: BlockTypeId) {
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                chunk.add_block_local(x, 0.0, z, default_block_type);
            }
        }
    }
}

/// Looks straight down from the player's eye; no input, no culling.
struct FixedCamera;

impl CameraDriver for FixedCamera {
    fn update(&mut self, _dt: f32, _player: &mut Player, _stepper: &mut PhysicsStepper, _world: &World) {}

    fn view_ray(&self, player: &Player) -> (Vec3, Vec3) {
        (player.eye_position(), Vec3::new(0.0, -1.0, 0.0))
    }
}

#[derive(Default)]
struct CollectSink {
    mesh_count: usize,
    selected: Option<RaycastHit>,
    draws: usize,
}

impl RenderSink for CollectSink {
    fn draw_world(&mut self, meshes: &[ChunkRenderItem], selected: Option<&RaycastHit>) {
        self.mesh_count = meshes.len();
        self.selected = selected.copied();
        self.draws += 1;
    }
}

fn small_config(tag: &str) -> (EngineConfig, std::path::PathBuf) {
    let path = temp_world_path(tag);
    let config = EngineConfig {
        world_save_path: path.clone(),
        initial_chunk_radius: 1,
        chunk_preload_radius: 1,
        ..EngineConfig::default()
    };
    (config, path)
}

#[test]
fn config_defaults_match_documented_values() {
    let config = EngineConfig::default();
    assert_eq!(config.atlas_grid_size, 16);
    assert_eq!(config.player_start, [0.0, -0.5, 0.0]);
    assert_eq!(config.player_move_speed, 5.0);
    assert_eq!(config.field_of_view, 67.0);
    assert_eq!(config.initial_pitch, -20.0);
    assert_eq!(config.mouse_sensitivity, 0.1);
    assert_eq!(config.gravity, -20.0);
    assert_eq!(config.jump_velocity, 7.0);
    assert_eq!(config.terminal_velocity, -50.0);
    assert_eq!(config.initial_chunk_radius, 16);
    assert_eq!(config.chunk_preload_radius, 1);
    assert_eq!(config.world_save_path, std::path::PathBuf::from("saves/world1"));
    assert_eq!(config.default_ground_block_type, 0);
    assert_eq!(config.world_seed, 0);
    assert!(config.auto_create_ground);
    assert!(config.texture_atlas_path.is_none());
}

#[test]
fn partial_toml_fills_in_defaults() {
    let dir = temp_world_path("toml");
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("engine.toml");
    std::fs::write(
        &file,
        "gravity = -30.0\nworld_seed = 42\nworld_save_path = \"saves/other\"\n",
    )
    .unwrap();

    let config = EngineConfig::from_toml_path(&file).expect("parse");
    assert_eq!(config.gravity, -30.0);
    assert_eq!(config.world_seed, 42);
    assert_eq!(config.world_save_path, std::path::PathBuf::from("saves/other"));
    // Unspecified fields keep their defaults
    assert_eq!(config.jump_velocity, 7.0);
    assert_eq!(config.atlas_grid_size, 16);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn update_and_render_require_initialization() {
    let (config, path) = small_config("uninit");
    let mut engine = Engine::new(config);
    let mut camera = FixedCamera;
    let mut sink = CollectSink::default();

    assert!(matches!(
        engine.update(0.016, &mut camera),
        Err(EngineError::NotInitialized)
    ));
    assert!(matches!(
        engine.render(&camera, &mut sink),
        Err(EngineError::NotInitialized)
    ));
    assert_eq!(sink.draws, 0);

    std::fs::remove_dir_all(&path).ok();
}

#[test]
fn initialize_spawns_player_above_terrain() {
    let (config, path) = small_config("spawn");
    let mut engine = Engine::new(config);
    engine
        .initialize(Arc::new(FlatGenerator), Box::new(RadiusLoadPolicy::new(1, -1, 64)))
        .expect("initialize");

    assert!(engine.is_initialized());
    // Flat slab top is 1.0; spawn two blocks above
    assert_eq!(engine.player().position().y, 3.0);

    // Initializing twice is a no-op
    engine
        .initialize(Arc::new(FlatGenerator), Box::new(RadiusLoadPolicy::new(1, -1, 64)))
        .expect("second initialize");

    engine.shutdown();
    std::fs::remove_dir_all(&path).ok();
}

#[test]
fn frame_loop_lands_player_meshes_world_and_selects_ground() {
    let (config, path) = small_config("loop");
    let mut engine = Engine::new(config);
    engine
        .initialize(Arc::new(FlatGenerator), Box::new(RadiusLoadPolicy::new(1, -1, 64)))
        .expect("initialize");

    let mut camera = FixedCamera;
    let mut sink = CollectSink::default();

    // ~2 seconds of frames: fall from y=3 to the slab and settle
    for _ in 0..120 {
        engine.update(1.0 / 60.0, &mut camera).expect("update");
        engine.render(&camera, &mut sink).expect("render");
    }

    assert!(engine.player().on_ground());
    assert_eq!(engine.player().position().y, 0.5);

    // 3x3 preloaded chunks, all meshed and visible without a frustum
    assert_eq!(sink.mesh_count, 9);
    assert!(sink.draws >= 120);

    // Looking straight down selects the block under the feet
    let hit = sink.selected.expect("ground selected");
    assert_eq!(hit.block_pos.y, 0);
    assert_eq!((hit.nx, hit.ny, hit.nz), (0, 1, 0));

    engine.shutdown();
    std::fs::remove_dir_all(&path).ok();
}

#[test]
fn engine_block_edits_invalidate_physics_cache() {
    let (config, path) = small_config("edits");
    let mut engine = Engine::new(config);
    engine
        .initialize(Arc::new(FlatGenerator), Box::new(RadiusLoadPolicy::new(1, -1, 64)))
        .expect("initialize");

    let mut camera = FixedCamera;
    for _ in 0..120 {
        engine.update(1.0 / 60.0, &mut camera).expect("update");
    }
    assert!(engine.player().on_ground());

    // Drop a block into the player's support column and stand on it
    engine.add_block(0.0, 1.0, 0.0, 3);
    assert_eq!(engine.world().get_block_type(0.0, 1.0, 0.0), Some(3));

    assert!(engine.remove_block(0.0, 1.0, 0.0));
    assert_eq!(engine.world().get_block_type(0.0, 1.0, 0.0), None);
    assert!(!engine.remove_block(0.0, 1.0, 0.0));

    engine.shutdown();
    std::fs::remove_dir_all(&path).ok();
}
