use bloxel_chunk::ChunkCoord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk header mismatch: expected ({}, {}), got ({found_cx}, {found_cz})", expected.cx, expected.cz)]
    HeaderMismatch {
        expected: ChunkCoord,
        found_cx: i32,
        found_cz: i32,
    },

    #[error("chunk manager not initialized")]
    ManagerNotInitialized,
}
