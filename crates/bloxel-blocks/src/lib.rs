//! Block positions, block data, and texture-atlas tile math.
#![forbid(unsafe_code)]

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Integer id naming a texture-atlas tile. Non-negative; the tile address
/// is `(id % grid, id / grid)`.
pub type BlockTypeId = i32;

/// Immutable integer block position. Usable as a map key with no float
/// precision concerns; derived from world space by flooring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing the world-space point (floor on every axis).
    #[inline]
    pub fn from_world(wx: f32, wy: f32, wz: f32) -> Self {
        Self {
            x: wx.floor() as i32,
            y: wy.floor() as i32,
            z: wz.floor() as i32,
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

/// A block: its position plus the atlas tile it renders with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockData {
    pub pos: BlockPos,
    pub block_type: BlockTypeId,
}

impl BlockData {
    #[inline]
    pub const fn new(pos: BlockPos, block_type: BlockTypeId) -> Self {
        Self { pos, block_type }
    }
}

/// UV rectangle of a single atlas tile, corners in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileUv {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// Tile-indexed atlas context. The image itself is loaded and uploaded by
/// the embedder; the engine only needs the grid geometry. When no path is
/// configured the layout is untextured and embedders substitute flat
/// colors per block type.
#[derive(Clone, Debug)]
pub struct AtlasLayout {
    path: Option<PathBuf>,
    grid_size: u32,
    tile_size: f32,
}

pub const DEFAULT_ATLAS_GRID: u32 = 16;

impl Default for AtlasLayout {
    fn default() -> Self {
        Self::new(None, DEFAULT_ATLAS_GRID)
    }
}

impl AtlasLayout {
    pub fn new(path: Option<PathBuf>, grid_size: u32) -> Self {
        let grid = grid_size.max(1);
        Self {
            path,
            grid_size: grid,
            tile_size: 1.0 / grid as f32,
        }
    }

    #[inline]
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// False when no atlas image was configured (colored fallback).
    #[inline]
    pub fn is_textured(&self) -> bool {
        self.path.is_some()
    }

    #[inline]
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    #[inline]
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Integer tile address for a block type.
    #[inline]
    pub fn tile_of(&self, block_type: BlockTypeId) -> (i32, i32) {
        let grid = self.grid_size as i32;
        (block_type.rem_euclid(grid), block_type.div_euclid(grid))
    }

    /// Exactly one tile's UV rect; never spans an atlas boundary.
    pub fn tile_uv(&self, block_type: BlockTypeId) -> TileUv {
        let (tx, ty) = self.tile_of(block_type);
        let u0 = tx as f32 * self.tile_size;
        let v0 = ty as f32 * self.tile_size;
        TileUv {
            u0,
            v0,
            u1: u0 + self.tile_size,
            v1: v0 + self.tile_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pos_from_world_floors() {
        assert_eq!(BlockPos::from_world(1.9, -0.1, 0.0), BlockPos::new(1, -1, 0));
        assert_eq!(BlockPos::from_world(-1.5, 2.0, -0.001), BlockPos::new(-2, 2, -1));
    }

    #[test]
    fn tile_uv_stays_inside_one_tile() {
        let atlas = AtlasLayout::new(Some(PathBuf::from("atlas.png")), 16);
        for block_type in [0, 1, 15, 16, 17, 255] {
            let uv = atlas.tile_uv(block_type);
            assert!(uv.u0 >= 0.0 && uv.u1 <= 1.0 + 1e-6);
            assert!(uv.v0 >= 0.0 && uv.v1 <= 1.0 + 1e-6);
            assert!((uv.u1 - uv.u0 - atlas.tile_size()).abs() < 1e-6);
            assert!((uv.v1 - uv.v0 - atlas.tile_size()).abs() < 1e-6);
        }
    }

    #[test]
    fn tile_address_wraps_by_grid() {
        let atlas = AtlasLayout::new(None, 16);
        assert_eq!(atlas.tile_of(0), (0, 0));
        assert_eq!(atlas.tile_of(15), (15, 0));
        assert_eq!(atlas.tile_of(16), (0, 1));
        assert_eq!(atlas.tile_of(37), (5, 2));
        assert!(!atlas.is_textured());
    }
}
