use bloxel_blocks::{BlockData, BlockPos, BlockTypeId};
use hashbrown::HashMap;

use crate::face::Face;

/// Per-block face visibility, indexed by [`Face::index`].
pub type FaceMask = [bool; 6];

/// A maximal rectangle of coplanar, same-type, face-visible unit faces.
/// `width` runs along the primary merge axis of the face's plane, `height`
/// along the secondary (see [`merge_visible_faces`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergedQuad {
    pub origin: BlockPos,
    pub width: i32,
    pub height: i32,
    pub block_type: BlockTypeId,
    pub face: Face,
}

struct FaceGrid {
    cells: HashMap<BlockPos, (BlockTypeId, FaceMask)>,
    min: BlockPos,
    max: BlockPos,
}

impl FaceGrid {
    fn new(blocks: &[BlockData], faces: &HashMap<BlockPos, FaceMask>) -> Option<Self> {
        let first = blocks.first()?;
        let mut min = first.pos;
        let mut max = first.pos;
        let mut cells = HashMap::with_capacity(blocks.len());
        for block in blocks {
            let p = block.pos;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
            if let Some(mask) = faces.get(&p) {
                cells.insert(p, (block.block_type, *mask));
            }
        }
        Some(Self { cells, min, max })
    }

    #[inline]
    fn has_face(&self, x: i32, y: i32, z: i32, face: Face) -> bool {
        self.cells
            .get(&BlockPos::new(x, y, z))
            .map(|(_, mask)| mask[face.index()])
            .unwrap_or(false)
    }

    #[inline]
    fn block_type(&self, x: i32, y: i32, z: i32) -> Option<BlockTypeId> {
        self.cells.get(&BlockPos::new(x, y, z)).map(|(t, _)| *t)
    }

    #[inline]
    fn dims(&self) -> (usize, usize, usize) {
        (
            (self.max.x - self.min.x + 1) as usize,
            (self.max.y - self.min.y + 1) as usize,
            (self.max.z - self.min.z + 1) as usize,
        )
    }
}

/// Dense visited volume over the grid's bounding box, reset per direction.
struct Visited {
    bits: Vec<bool>,
    min: BlockPos,
    nx: usize,
    ny: usize,
}

impl Visited {
    fn new(grid: &FaceGrid) -> Self {
        let (nx, ny, nz) = grid.dims();
        Self {
            bits: vec![false; nx * ny * nz],
            min: grid.min,
            nx,
            ny,
        }
    }

    fn reset(&mut self) {
        self.bits.fill(false);
    }

    #[inline]
    fn idx(&self, x: i32, y: i32, z: i32) -> usize {
        let lx = (x - self.min.x) as usize;
        let ly = (y - self.min.y) as usize;
        let lz = (z - self.min.z) as usize;
        (lz * self.ny + ly) * self.nx + lx
    }

    #[inline]
    fn get(&self, x: i32, y: i32, z: i32) -> bool {
        self.bits[self.idx(x, y, z)]
    }

    #[inline]
    fn set(&mut self, x: i32, y: i32, z: i32) {
        let i = self.idx(x, y, z);
        self.bits[i] = true;
    }
}

/// Merges visible faces into maximal rectangles, one pass per direction.
///
/// Plane assignment: Front/Back sweep constant-Z planes merging X then Y;
/// Left/Right sweep constant-X planes merging Z then Y; Top/Bottom sweep
/// constant-Y planes merging X then Z. Identical inputs yield identical
/// quad sequences; ties break by traversal order.
pub fn merge_visible_faces(
    blocks: &[BlockData],
    faces: &HashMap<BlockPos, FaceMask>,
) -> Vec<MergedQuad> {
    let grid = match FaceGrid::new(blocks, faces) {
        Some(g) => g,
        None => return Vec::new(),
    };
    let mut visited = Visited::new(&grid);
    let mut quads = Vec::new();
    for face in Face::ALL {
        visited.reset();
        match face {
            Face::Front | Face::Back => merge_xy(&grid, face, &mut visited, &mut quads),
            Face::Left | Face::Right => merge_zy(&grid, face, &mut visited, &mut quads),
            Face::Top | Face::Bottom => merge_xz(&grid, face, &mut visited, &mut quads),
        }
    }
    quads
}

/// XY planes (Front/Back): width along +X, height along +Y.
fn merge_xy(grid: &FaceGrid, face: Face, visited: &mut Visited, quads: &mut Vec<MergedQuad>) {
    for z in grid.min.z..=grid.max.z {
        for y in grid.min.y..=grid.max.y {
            for x in grid.min.x..=grid.max.x {
                if visited.get(x, y, z) || !grid.has_face(x, y, z, face) {
                    continue;
                }
                let block_type = grid.block_type(x, y, z).unwrap_or(-1);

                let mut width = 1;
                while x + width <= grid.max.x
                    && !visited.get(x + width, y, z)
                    && grid.has_face(x + width, y, z, face)
                    && grid.block_type(x + width, y, z) == Some(block_type)
                {
                    width += 1;
                }

                let mut height = 1;
                'grow: while y + height <= grid.max.y {
                    for dx in 0..width {
                        if visited.get(x + dx, y + height, z)
                            || !grid.has_face(x + dx, y + height, z, face)
                            || grid.block_type(x + dx, y + height, z) != Some(block_type)
                        {
                            break 'grow;
                        }
                    }
                    height += 1;
                }

                quads.push(MergedQuad {
                    origin: BlockPos::new(x, y, z),
                    width,
                    height,
                    block_type,
                    face,
                });
                for dy in 0..height {
                    for dx in 0..width {
                        visited.set(x + dx, y + dy, z);
                    }
                }
            }
        }
    }
}

/// ZY planes (Left/Right): width along +Z, height along +Y.
fn merge_zy(grid: &FaceGrid, face: Face, visited: &mut Visited, quads: &mut Vec<MergedQuad>) {
    for x in grid.min.x..=grid.max.x {
        for y in grid.min.y..=grid.max.y {
            for z in grid.min.z..=grid.max.z {
                if visited.get(x, y, z) || !grid.has_face(x, y, z, face) {
                    continue;
                }
                let block_type = grid.block_type(x, y, z).unwrap_or(-1);

                let mut width = 1;
                while z + width <= grid.max.z
                    && !visited.get(x, y, z + width)
                    && grid.has_face(x, y, z + width, face)
                    && grid.block_type(x, y, z + width) == Some(block_type)
                {
                    width += 1;
                }

                let mut height = 1;
                'grow: while y + height <= grid.max.y {
                    for dz in 0..width {
                        if visited.get(x, y + height, z + dz)
                            || !grid.has_face(x, y + height, z + dz, face)
                            || grid.block_type(x, y + height, z + dz) != Some(block_type)
                        {
                            break 'grow;
                        }
                    }
                    height += 1;
                }

                quads.push(MergedQuad {
                    origin: BlockPos::new(x, y, z),
                    width,
                    height,
                    block_type,
                    face,
                });
                for dy in 0..height {
                    for dz in 0..width {
                        visited.set(x, y + dy, z + dz);
                    }
                }
            }
        }
    }
}

/// XZ planes (Top/Bottom): width along +X, depth along +Z.
fn merge_xz(grid: &FaceGrid, face: Face, visited: &mut Visited, quads: &mut Vec<MergedQuad>) {
    for y in grid.min.y..=grid.max.y {
        for z in grid.min.z..=grid.max.z {
            for x in grid.min.x..=grid.max.x {
                if visited.get(x, y, z) || !grid.has_face(x, y, z, face) {
                    continue;
                }
                let block_type = grid.block_type(x, y, z).unwrap_or(-1);

                let mut width = 1;
                while x + width <= grid.max.x
                    && !visited.get(x + width, y, z)
                    && grid.has_face(x + width, y, z, face)
                    && grid.block_type(x + width, y, z) == Some(block_type)
                {
                    width += 1;
                }

                let mut depth = 1;
                'grow: while z + depth <= grid.max.z {
                    for dx in 0..width {
                        if visited.get(x + dx, y, z + depth)
                            || !grid.has_face(x + dx, y, z + depth, face)
                            || grid.block_type(x + dx, y, z + depth) != Some(block_type)
                        {
                            break 'grow;
                        }
                    }
                    depth += 1;
                }

                quads.push(MergedQuad {
                    origin: BlockPos::new(x, y, z),
                    width,
                    height: depth,
                    block_type,
                    face,
                });
                for dz in 0..depth {
                    for dx in 0..width {
                        visited.set(x + dx, y, z + dz);
                    }
                }
            }
        }
    }
}
