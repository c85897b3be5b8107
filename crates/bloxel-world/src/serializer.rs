use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bloxel_chunk::{Chunk, ChunkCoord};

use crate::error::WorldError;

/// On-disk chunk format, little-endian throughout:
///
/// ```text
/// i32 chunk_x
/// i32 chunk_z
/// i32 block_count
/// block_count times: i32 local_x, i32 block_y, i32 local_z, i32 block_type
/// ```
///
/// Files live at `<world_path>/chunks/chunk_<cx>_<cz>.dat`.
pub struct ChunkSerializer;

impl ChunkSerializer {
    pub fn chunk_file(world_path: &Path, coord: ChunkCoord) -> PathBuf {
        world_path
            .join("chunks")
            .join(format!("chunk_{}_{}.dat", coord.cx, coord.cz))
    }

    pub fn chunk_file_exists(world_path: &Path, coord: ChunkCoord) -> bool {
        Self::chunk_file(world_path, coord).exists()
    }

    pub fn save(chunk: &Chunk, file: &Path) -> Result<(), WorldError> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(file)?);
        let coord = chunk.coord();
        write_i32(&mut out, coord.cx)?;
        write_i32(&mut out, coord.cz)?;

        let blocks = chunk.blocks_snapshot();
        write_i32(&mut out, blocks.len() as i32)?;
        for block in &blocks {
            write_i32(&mut out, block.pos.x)?;
            write_i32(&mut out, block.pos.y)?;
            write_i32(&mut out, block.pos.z)?;
            write_i32(&mut out, block.block_type)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Reads block data into an existing chunk object, preserving its
    /// identity across the async load path. The header must match the
    /// chunk's coordinate; a mismatch is fatal for this read.
    pub fn load_into(chunk: &Chunk, file: &Path) -> Result<(), WorldError> {
        let mut input = BufReader::new(File::open(file)?);
        let chunk_x = read_i32(&mut input)?;
        let chunk_z = read_i32(&mut input)?;
        let coord = chunk.coord();
        if coord.cx != chunk_x || coord.cz != chunk_z {
            return Err(WorldError::HeaderMismatch {
                expected: coord,
                found_cx: chunk_x,
                found_cz: chunk_z,
            });
        }

        let block_count = read_i32(&mut input)?;
        log::debug!(
            "loading chunk ({}, {}), {} blocks from {}",
            chunk_x,
            chunk_z,
            block_count,
            file.display()
        );
        for _ in 0..block_count {
            let local_x = read_i32(&mut input)?;
            let block_y = read_i32(&mut input)?;
            let local_z = read_i32(&mut input)?;
            let block_type = read_i32(&mut input)?;
            chunk.add_block_local(local_x, block_y as f32, local_z, block_type);
        }
        chunk.mark_generated();
        Ok(())
    }

    /// Reads a fresh chunk; used by the synchronous initial-load path.
    pub fn load_new(file: &Path) -> Result<Chunk, WorldError> {
        let mut input = BufReader::new(File::open(file)?);
        let chunk_x = read_i32(&mut input)?;
        let chunk_z = read_i32(&mut input)?;
        let chunk = Chunk::new(ChunkCoord::new(chunk_x, chunk_z));

        let block_count = read_i32(&mut input)?;
        for _ in 0..block_count {
            let local_x = read_i32(&mut input)?;
            let block_y = read_i32(&mut input)?;
            let local_z = read_i32(&mut input)?;
            let block_type = read_i32(&mut input)?;
            chunk.add_block_local(local_x, block_y as f32, local_z, block_type);
        }
        chunk.mark_generated();
        Ok(chunk)
    }
}

#[inline]
fn write_i32<W: Write>(out: &mut W, v: i32) -> Result<(), WorldError> {
    out.write_all(&v.to_le_bytes())?;
    Ok(())
}

#[inline]
fn read_i32<R: Read>(input: &mut R) -> Result<i32, WorldError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
