//! Streaming, persistent, chunked block-voxel engine core.
//!
//! The embedder supplies terrain generation and residency policy, owns the
//! window/input/GPU stack, and drives [`Engine::update`] and
//! [`Engine::render`] once per frame. The engine owns chunk residency and
//! lifecycle, greedy meshing with atlas-safe emission, fixed-timestep
//! axis-separated player physics, and crosshair raycasting.
#![forbid(unsafe_code)]

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::{CameraDriver, Engine, RenderSink, CHUNK_UPDATE_INTERVAL};
pub use error::EngineError;

pub use bloxel_blocks as blocks;
pub use bloxel_chunk as chunk;
pub use bloxel_geom as geom;
pub use bloxel_mesh_cpu as mesh;
pub use bloxel_physics as physics;
pub use bloxel_world as world;
