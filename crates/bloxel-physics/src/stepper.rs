use bloxel_chunk::ChunkCoord;
use bloxel_geom::{Aabb, Vec3};
use bloxel_world::World;

use crate::player::{Player, PLAYER_HEIGHT, PLAYER_WIDTH};

pub const GRAVITY: f32 = -20.0;
pub const JUMP_VELOCITY: f32 = 7.0;
pub const TERMINAL_VELOCITY: f32 = -50.0;

/// 60 Hz simulation step, decoupled from the frame rate.
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;
/// Frame-delta clamp; keeps a long hitch from spiraling the accumulator.
pub const MAX_FRAME_TIME: f32 = 0.25;
/// Chunk radius of the nearby-block collision cache (1 = 3x3).
pub const PHYSICS_CHUNK_RADIUS: i32 = 1;

const BLOCK_HALF: f32 = 0.5;
const COLLISION_MARGIN: f32 = 0.001;
/// Maximum gap between the soles and a block top that still counts as
/// standing on it.
const GROUND_THRESHOLD: f32 = 0.02;
/// Minimum X/Z footprint overlap for cliff support; excludes corners.
const MIN_XZ_OVERLAP: f32 = 0.1;

/// Axis-separated collision resolution on a fixed accumulator.
///
/// Order within a step is Y, then the cliff-edge check, then X, then Z.
/// `on_ground` changes only in the Y step and the cliff check; X/Z
/// resolution never touches it, which is what keeps the flag stable while
/// sliding along block seams.
pub struct PhysicsStepper {
    gravity: f32,
    jump_velocity: f32,
    terminal_velocity: f32,
    accumulator: f32,
    nearby_blocks: Vec<Vec3>,
    last_physics_chunk: Option<ChunkCoord>,
    cache_invalidated: bool,
}

impl Default for PhysicsStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsStepper {
    pub fn new() -> Self {
        Self::with_parameters(GRAVITY, JUMP_VELOCITY, TERMINAL_VELOCITY)
    }

    pub fn with_parameters(gravity: f32, jump_velocity: f32, terminal_velocity: f32) -> Self {
        Self {
            gravity,
            jump_velocity,
            terminal_velocity,
            accumulator: 0.0,
            nearby_blocks: Vec::new(),
            last_physics_chunk: None,
            cache_invalidated: false,
        }
    }

    /// Marks the nearby-block cache stale; the next step refetches it.
    /// Call after any block edit near the player.
    pub fn invalidate_cache(&mut self) {
        self.cache_invalidated = true;
    }

    /// Advances the simulation by `delta` seconds in fixed steps,
    /// carrying the remainder to the next frame.
    pub fn update(&mut self, world: &World, player: &mut Player, delta: f32) {
        let delta = delta.min(MAX_FRAME_TIME);
        self.accumulator += delta;
        while self.accumulator >= FIXED_TIMESTEP {
            self.step(world, player, FIXED_TIMESTEP);
            self.accumulator -= FIXED_TIMESTEP;
        }
    }

    /// Sets the jump impulse iff the player is grounded.
    pub fn try_jump(&self, player: &mut Player) {
        if player.on_ground() {
            player.velocity_mut().y = self.jump_velocity;
            player.set_on_ground(false);
        }
    }

    fn step(&mut self, world: &World, player: &mut Player, dt: f32) {
        let pos = player.position();
        let current_chunk = ChunkCoord::from_world(pos.x, pos.z);
        if self.last_physics_chunk != Some(current_chunk) || self.cache_invalidated {
            self.nearby_blocks =
                world.get_nearby_block_positions(pos.x, pos.z, PHYSICS_CHUNK_RADIUS);
            self.last_physics_chunk = Some(current_chunk);
            self.cache_invalidated = false;
        }

        self.apply_gravity(player, dt);

        let vel = player.velocity();
        self.move_and_collide(player, vel.x * dt, vel.y * dt, vel.z * dt);
    }

    fn apply_gravity(&self, player: &mut Player, dt: f32) {
        if !player.on_ground() {
            let vel = player.velocity_mut();
            vel.y += self.gravity * dt;
            if vel.y < self.terminal_velocity {
                vel.y = self.terminal_velocity;
            }
        }
    }

    /// Per-axis move and resolve. Every axis write goes through
    /// `set_position` so the AABB stays synchronized before the next
    /// axis is tested.
    fn move_and_collide(&self, player: &mut Player, dx: f32, dy: f32, dz: f32) {
        let mut current = player.position();

        if dy != 0.0 {
            current.y += dy;
            player.set_position(current);

            let aabb = *player.aabb();
            if self.collides_on_y(&aabb) {
                if dy > 0.0 {
                    current.y = self.find_ceiling_y(&aabb) - PLAYER_HEIGHT;
                    player.set_on_ground(false);
                } else {
                    current.y = self.find_floor_y(&aabb);
                    player.set_on_ground(true);
                }
                player.set_position(current);
                player.velocity_mut().y = 0.0;
            } else if dy < 0.0 {
                player.set_on_ground(false);
            }
        }

        // Cliff-edge detection runs after the Y step and before any X/Z
        // movement; running it later gives false negatives at block
        // boundaries.
        if player.on_ground() && dy == 0.0 && !self.has_ground_directly_below(player) {
            player.set_on_ground(false);
        }

        if dx != 0.0 {
            current.x += dx;
            player.set_position(current);

            let aabb = *player.aabb();
            if self.collides_on_x(&aabb) {
                if dx > 0.0 {
                    current.x = self.find_wall_x_positive(&aabb) - PLAYER_WIDTH / 2.0 - COLLISION_MARGIN;
                } else {
                    current.x = self.find_wall_x_negative(&aabb) + PLAYER_WIDTH / 2.0 + COLLISION_MARGIN;
                }
                player.set_position(current);
                player.velocity_mut().x = 0.0;
            }
        }

        if dz != 0.0 {
            current.z += dz;
            player.set_position(current);

            let aabb = *player.aabb();
            if self.collides_on_z(&aabb) {
                if dz > 0.0 {
                    current.z = self.find_wall_z_positive(&aabb) - PLAYER_WIDTH / 2.0 - COLLISION_MARGIN;
                } else {
                    current.z = self.find_wall_z_negative(&aabb) + PLAYER_WIDTH / 2.0 + COLLISION_MARGIN;
                }
                player.set_position(current);
                player.velocity_mut().z = 0.0;
            }
        }
    }

    fn collides_on_y(&self, player_aabb: &Aabb) -> bool {
        self.nearby_blocks
            .iter()
            .any(|p| player_aabb.intersects_on_y(&Aabb::cube(*p, BLOCK_HALF)))
    }

    fn collides_on_x(&self, player_aabb: &Aabb) -> bool {
        self.nearby_blocks
            .iter()
            .any(|p| player_aabb.intersects_on_x(&Aabb::cube(*p, BLOCK_HALF)))
    }

    fn collides_on_z(&self, player_aabb: &Aabb) -> bool {
        self.nearby_blocks
            .iter()
            .any(|p| player_aabb.intersects_on_z(&Aabb::cube(*p, BLOCK_HALF)))
    }

    /// Highest block top among Y-colliding blocks (landing height).
    fn find_floor_y(&self, player_aabb: &Aabb) -> f32 {
        let mut highest = f32::MIN;
        for p in &self.nearby_blocks {
            if player_aabb.intersects_on_y(&Aabb::cube(*p, BLOCK_HALF)) {
                highest = highest.max(p.y + BLOCK_HALF);
            }
        }
        highest
    }

    /// Lowest block bottom among Y-colliding blocks (head clearance).
    fn find_ceiling_y(&self, player_aabb: &Aabb) -> f32 {
        let mut lowest = f32::MAX;
        for p in &self.nearby_blocks {
            if player_aabb.intersects_on_y(&Aabb::cube(*p, BLOCK_HALF)) {
                lowest = lowest.min(p.y - BLOCK_HALF);
            }
        }
        lowest
    }

    fn find_wall_x_positive(&self, player_aabb: &Aabb) -> f32 {
        let mut nearest = f32::MAX;
        for p in &self.nearby_blocks {
            if player_aabb.intersects_on_x(&Aabb::cube(*p, BLOCK_HALF)) {
                nearest = nearest.min(p.x - BLOCK_HALF);
            }
        }
        nearest
    }

    fn find_wall_x_negative(&self, player_aabb: &Aabb) -> f32 {
        let mut nearest = f32::MIN;
        for p in &self.nearby_blocks {
            if player_aabb.intersects_on_x(&Aabb::cube(*p, BLOCK_HALF)) {
                nearest = nearest.max(p.x + BLOCK_HALF);
            }
        }
        nearest
    }

    fn find_wall_z_positive(&self, player_aabb: &Aabb) -> f32 {
        let mut nearest = f32::MAX;
        for p in &self.nearby_blocks {
            if player_aabb.intersects_on_z(&Aabb::cube(*p, BLOCK_HALF)) {
                nearest = nearest.min(p.z - BLOCK_HALF);
            }
        }
        nearest
    }

    fn find_wall_z_negative(&self, player_aabb: &Aabb) -> f32 {
        let mut nearest = f32::MIN;
        for p in &self.nearby_blocks {
            if player_aabb.intersects_on_z(&Aabb::cube(*p, BLOCK_HALF)) {
                nearest = nearest.max(p.z + BLOCK_HALF);
            }
        }
        nearest
    }

    /// Cliff support probe: a block whose top sits within
    /// [`GROUND_THRESHOLD`] below the soles and whose footprint overlaps
    /// the player's by more than [`MIN_XZ_OVERLAP`] on both axes.
    fn has_ground_directly_below(&self, player: &Player) -> bool {
        let player_bottom = player.position().y;
        let player_aabb = player.aabb();

        for p in &self.nearby_blocks {
            let block_top = p.y + BLOCK_HALF;
            let y_gap = player_bottom - block_top;
            if !(0.0..=GROUND_THRESHOLD).contains(&y_gap) {
                continue;
            }

            let block = Aabb::cube(*p, BLOCK_HALF);
            let x_overlap = player_aabb.max().x.min(block.max().x)
                - player_aabb.min().x.max(block.min().x);
            let z_overlap = player_aabb.max().z.min(block.max().z)
                - player_aabb.min().z.max(block.min().z);
            if x_overlap > MIN_XZ_OVERLAP && z_overlap > MIN_XZ_OVERLAP {
                return true;
            }
        }
        false
    }
}
