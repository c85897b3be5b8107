use std::sync::Arc;

use bloxel_blocks::AtlasLayout;
use bloxel_geom::{Frustum, Vec3};
use bloxel_physics::{raycast, Player, PhysicsStepper, RaycastHit};
use bloxel_world::{ChunkGenerator, ChunkLoadPolicy, ChunkRenderItem, World};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Chunk residency tick interval: 20 Hz, decoupled from the frame rate.
pub const CHUNK_UPDATE_INTERVAL: f32 = 0.05;

/// Input/camera collaborator. Owns look state and movement intent; the
/// engine calls it once per update before stepping physics.
pub trait CameraDriver {
    /// Apply input: steer the player's horizontal velocity, request jumps
    /// via [`PhysicsStepper::try_jump`], update look angles.
    fn update(&mut self, dt: f32, player: &mut Player, stepper: &mut PhysicsStepper, world: &World);

    /// Eye-space ray for crosshair block selection.
    fn view_ray(&self, player: &Player) -> (Vec3, Vec3);

    /// Culling volume; `None` disables frustum culling.
    fn frustum(&self) -> Option<Frustum> {
        None
    }
}

/// Render collaborator: receives the culled mesh list and the currently
/// selected block once per render call.
pub trait RenderSink {
    fn draw_world(&mut self, meshes: &[ChunkRenderItem], selected: Option<&RaycastHit>);
}

/// Frame-loop orchestrator over world, player, and physics.
pub struct Engine {
    config: EngineConfig,
    world: World,
    player: Player,
    physics: PhysicsStepper,
    selected: Option<RaycastHit>,
    chunk_update_accumulator: f32,
    initialized: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let atlas = AtlasLayout::new(config.texture_atlas_path.clone(), config.atlas_grid_size);
        let player = Player::new(Vec3::new(
            config.player_start[0],
            config.player_start[1],
            config.player_start[2],
        ));
        let physics = PhysicsStepper::with_parameters(
            config.gravity,
            config.jump_velocity,
            config.terminal_velocity,
        );
        Self {
            world: World::new(atlas),
            player,
            physics,
            selected: None,
            chunk_update_accumulator: 0.0,
            config,
            initialized: false,
        }
    }

    /// Installs the chunk system and, with `auto_create_ground`, runs the
    /// synchronous spawn-area generation, dropping the player two blocks
    /// above the probed terrain height. Idempotent.
    pub fn initialize(
        &mut self,
        generator: Arc<dyn ChunkGenerator>,
        policy: Box<dyn ChunkLoadPolicy>,
    ) -> Result<(), EngineError> {
        if self.initialized {
            return Ok(());
        }
        self.world.init_with_chunks(
            &self.config.world_save_path,
            self.config.default_ground_block_type,
            generator,
            policy,
        );

        let mut spawn_y = self.config.player_start[1];
        if self.config.auto_create_ground {
            let terrain_height = self.world.generate_initial_chunks(
                self.config.player_start[0],
                self.config.player_start[2],
                self.config.initial_chunk_radius,
                self.config.chunk_preload_radius,
            )?;
            spawn_y = terrain_height + 2.0;
        }
        self.player.set_position(Vec3::new(
            self.config.player_start[0],
            spawn_y,
            self.config.player_start[2],
        ));
        self.initialized = true;
        log::info!(
            "engine initialized: world at {}, spawn ({}, {spawn_y}, {})",
            self.config.world_save_path.display(),
            self.config.player_start[0],
            self.config.player_start[2],
        );
        Ok(())
    }

    /// Per-frame update: tick-gated chunk residency, per-frame pending
    /// drain, camera/input, fixed-step physics, crosshair raycast.
    pub fn update(&mut self, dt: f32, camera: &mut dyn CameraDriver) -> Result<(), EngineError> {
        self.ensure_initialized()?;

        self.chunk_update_accumulator += dt;
        if self.chunk_update_accumulator >= CHUNK_UPDATE_INTERVAL {
            let pos = self.player.position();
            self.world.update_chunks(pos.x, pos.z);
            self.chunk_update_accumulator -= CHUNK_UPDATE_INTERVAL;
        }

        // Completed chunks surface every frame, not just on ticks
        self.world.process_pending();

        camera.update(dt, &mut self.player, &mut self.physics, &self.world);
        self.physics.update(&self.world, &mut self.player, dt);

        let (origin, dir) = camera.view_ray(&self.player);
        self.selected = raycast(&self.world, origin, dir);
        Ok(())
    }

    /// Per-frame render: rebuild dirty meshes, frustum-cull, hand off.
    pub fn render(
        &mut self,
        camera: &dyn CameraDriver,
        sink: &mut dyn RenderSink,
    ) -> Result<(), EngineError> {
        self.ensure_initialized()?;

        self.world.rebuild_dirty_meshes();
        let frustum = camera.frustum();
        let items = self.world.visible_meshes(frustum.as_ref());
        sink.draw_world(&items, self.selected.as_ref());
        Ok(())
    }

    /// Block placement that also invalidates the physics nearby cache.
    pub fn add_block(&mut self, wx: f32, wy: f32, wz: f32, block_type: i32) {
        self.world.add_block(wx, wy, wz, block_type);
        self.physics.invalidate_cache();
    }

    /// Block removal that also invalidates the physics nearby cache.
    pub fn remove_block(&mut self, wx: f32, wy: f32, wz: f32) -> bool {
        let removed = self.world.remove_block(wx, wy, wz);
        if removed {
            self.physics.invalidate_cache();
        }
        removed
    }

    pub fn try_jump(&mut self) {
        self.physics.try_jump(&mut self.player);
    }

    fn ensure_initialized(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsStepper {
        &mut self.physics
    }

    pub fn selected_block(&self) -> Option<&RaycastHit> {
        self.selected.as_ref()
    }

    /// Drains workers and drops the chunk system.
    pub fn shutdown(&mut self) {
        self.world.clear();
        self.initialized = false;
    }
}
