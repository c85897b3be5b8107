use bloxel_geom::{Aabb, Vec3};

pub const PLAYER_WIDTH: f32 = 0.6;
pub const PLAYER_HEIGHT: f32 = 1.8;
pub const EYE_HEIGHT: f32 = 1.62;

/// Kinematic player body: feet position (x/z at the footprint center,
/// y at the soles), velocity, ground flag, and a collision box that is
/// recomputed on every position write so the two can never drift apart.
#[derive(Debug)]
pub struct Player {
    pos: Vec3,
    vel: Vec3,
    on_ground: bool,
    aabb: Aabb,
}

impl Player {
    pub fn new(spawn: Vec3) -> Self {
        let center = Vec3::new(spawn.x, spawn.y + PLAYER_HEIGHT / 2.0, spawn.z);
        Self {
            pos: spawn,
            vel: Vec3::ZERO,
            on_ground: false,
            aabb: Aabb::new(center, PLAYER_WIDTH / 2.0, PLAYER_HEIGHT / 2.0, PLAYER_WIDTH / 2.0),
        }
    }

    /// Writes the position and synchronizes the AABB in the same call.
    pub fn set_position(&mut self, pos: Vec3) {
        self.pos = pos;
        self.aabb.set_center(Vec3::new(
            pos.x,
            pos.y + PLAYER_HEIGHT / 2.0,
            pos.z,
        ));
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.pos
    }

    /// Eye point for camera placement and crosshair rays.
    #[inline]
    pub fn eye_position(&self) -> Vec3 {
        Vec3::new(self.pos.x, self.pos.y + EYE_HEIGHT, self.pos.z)
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.vel
    }

    #[inline]
    pub fn velocity_mut(&mut self) -> &mut Vec3 {
        &mut self.vel
    }

    pub fn set_velocity(&mut self, vel: Vec3) {
        self.vel = vel;
    }

    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    #[inline]
    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub fn set_on_ground(&mut self, on_ground: bool) {
        self.on_ground = on_ground;
    }
}
