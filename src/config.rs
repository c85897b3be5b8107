use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine configuration. Every field has a sensible default, so partial
/// TOML files work; the generator and residency policy are code, not
/// data, and are passed to [`crate::Engine::initialize`] instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Atlas image path; `None` renders with per-type flat colors.
    pub texture_atlas_path: Option<PathBuf>,
    pub atlas_grid_size: u32,

    /// Player spawn (feet) position. With `auto_create_ground` the Y is
    /// replaced by the generated terrain height plus two blocks.
    pub player_start: [f32; 3],
    pub player_move_speed: f32,

    pub field_of_view: f32,
    pub initial_pitch: f32,
    pub mouse_sensitivity: f32,

    pub gravity: f32,
    pub jump_velocity: f32,
    pub terminal_velocity: f32,

    /// File-generation radius around spawn, in chunks.
    pub initial_chunk_radius: i32,
    /// Memory-load radius around spawn, in chunks.
    pub chunk_preload_radius: i32,
    pub world_save_path: PathBuf,
    pub default_ground_block_type: i32,
    pub world_seed: i64,
    pub auto_create_ground: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            texture_atlas_path: None,
            atlas_grid_size: 16,
            player_start: [0.0, -0.5, 0.0],
            player_move_speed: 5.0,
            field_of_view: 67.0,
            initial_pitch: -20.0,
            mouse_sensitivity: 0.1,
            gravity: -20.0,
            jump_velocity: 7.0,
            terminal_velocity: -50.0,
            initial_chunk_radius: 16,
            chunk_preload_radius: 1,
            world_save_path: PathBuf::from("saves/world1"),
            default_ground_block_type: 0,
            world_seed: 0,
            auto_create_ground: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
