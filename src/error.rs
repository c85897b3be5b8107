use thiserror::Error;

use bloxel_world::WorldError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine not initialized; call initialize() first")]
    NotInitialized,

    #[error(transparent)]
    World(#[from] WorldError),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
