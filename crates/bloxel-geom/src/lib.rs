//! Minimal geometry types for engine crates (no renderer dependency).
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

mod frustum;

pub use frustum::{Frustum, Plane};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, rhs: Vec3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 { self / len } else { self }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Minimum overlap on the two free axes before a directed intersection
/// counts. Distinguishes wall contact from floor landing when the box is
/// flush with a face.
pub const MIN_AXIS_OVERLAP: f32 = 0.01;

/// Axis-aligned box stored as center + half-extents with derived min/max,
/// so directed collision queries stay allocation-free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    center: Vec3,
    half: Vec3,
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half_width: f32, half_height: f32, half_depth: f32) -> Self {
        let mut aabb = Self {
            center,
            half: Vec3::new(half_width, half_height, half_depth),
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        };
        aabb.update_bounds();
        aabb
    }

    /// Cube-shaped box (all half-extents equal).
    pub fn cube(center: Vec3, half_size: f32) -> Self {
        Self::new(center, half_size, half_size, half_size)
    }

    /// Box from explicit corners; `min`/`max` are taken as given.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) / 2.0,
            half: (max - min) / 2.0,
            min,
            max,
        }
    }

    #[inline]
    fn update_bounds(&mut self) {
        self.min = self.center - self.half;
        self.max = self.center + self.half;
    }

    pub fn set_center(&mut self, center: Vec3) {
        self.center = center;
        self.update_bounds();
    }

    pub fn set_size(&mut self, half_width: f32, half_height: f32, half_depth: f32) {
        self.half = Vec3::new(half_width, half_height, half_depth);
        self.update_bounds();
    }

    pub fn offset(&mut self, dx: f32, dy: f32, dz: f32) {
        self.center += Vec3::new(dx, dy, dz);
        self.update_bounds();
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Open-interval overlap on all three axes.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.max.x > other.min.x
            && self.min.x < other.max.x
            && self.max.y > other.min.y
            && self.min.y < other.max.y
            && self.max.z > other.min.z
            && self.min.z < other.max.z
    }

    #[inline]
    fn overlap(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
        a_max.min(b_max) - a_min.max(b_min)
    }

    /// Y-directed collision: Y ranges overlap and the X/Z footprints
    /// overlap by strictly more than [`MIN_AXIS_OVERLAP`]. Wall or corner
    /// grazes are not Y collisions.
    pub fn intersects_on_y(&self, other: &Aabb) -> bool {
        if !(self.max.y > other.min.y && self.min.y < other.max.y) {
            return false;
        }
        let x_overlap = Self::overlap(self.min.x, self.max.x, other.min.x, other.max.x);
        let z_overlap = Self::overlap(self.min.z, self.max.z, other.min.z, other.max.z);
        x_overlap > MIN_AXIS_OVERLAP && z_overlap > MIN_AXIS_OVERLAP
    }

    /// X-directed collision; Y/Z must overlap by more than the gate.
    pub fn intersects_on_x(&self, other: &Aabb) -> bool {
        if !(self.max.x > other.min.x && self.min.x < other.max.x) {
            return false;
        }
        let y_overlap = Self::overlap(self.min.y, self.max.y, other.min.y, other.max.y);
        let z_overlap = Self::overlap(self.min.z, self.max.z, other.min.z, other.max.z);
        y_overlap > MIN_AXIS_OVERLAP && z_overlap > MIN_AXIS_OVERLAP
    }

    /// Z-directed collision; X/Y must overlap by more than the gate.
    pub fn intersects_on_z(&self, other: &Aabb) -> bool {
        if !(self.max.z > other.min.z && self.min.z < other.max.z) {
            return false;
        }
        let x_overlap = Self::overlap(self.min.x, self.max.x, other.min.x, other.max.x);
        let y_overlap = Self::overlap(self.min.y, self.max.y, other.min.y, other.max.y);
        x_overlap > MIN_AXIS_OVERLAP && y_overlap > MIN_AXIS_OVERLAP
    }
}
