//! Fixed-timestep kinematic player physics and block raycasting.
#![forbid(unsafe_code)]

mod player;
mod raycast;
mod stepper;

pub use player::{Player, EYE_HEIGHT, PLAYER_HEIGHT, PLAYER_WIDTH};
pub use raycast::{raycast, RaycastHit, RAY_MAX_DISTANCE, RAY_STEP};
pub use stepper::{
    PhysicsStepper, FIXED_TIMESTEP, GRAVITY, JUMP_VELOCITY, MAX_FRAME_TIME, PHYSICS_CHUNK_RADIUS,
    TERMINAL_VELOCITY,
};
