use bloxel_blocks::AtlasLayout;
use bloxel_geom::{Aabb, Vec3};

use crate::face::Face;
use crate::greedy::MergedQuad;
use crate::mesh_build::MeshBuild;

const HALF: f32 = 0.5;

/// Unified per-chunk geometry in world coordinates, plus a bounding box
/// over the emitted vertices for debug drawing.
#[derive(Debug)]
pub struct ChunkMeshCpu {
    pub build: MeshBuild,
    pub bbox: Aabb,
}

/// Expands merged rectangles into atlas-safe unit quads.
///
/// The atlas is non-tileable, so a merged `width x height` rectangle
/// becomes `width x height` individual unit quads, each carrying exactly
/// one tile's UV rect. The visited-cell bookkeeping of the merge stays
/// useful while no quad ever spans an atlas tile boundary.
pub fn build_chunk_mesh(quads: &[MergedQuad], atlas: &AtlasLayout) -> ChunkMeshCpu {
    let mut build = MeshBuild::default();
    let unit_quads: usize = quads
        .iter()
        .map(|q| (q.width.max(0) as usize) * (q.height.max(0) as usize))
        .sum();
    build.reserve_quads(unit_quads);

    let mut bb_min = Vec3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut bb_max = Vec3::new(f32::MIN, f32::MIN, f32::MIN);

    for quad in quads {
        let uv = atlas.tile_uv(quad.block_type);
        let uvs = [
            (uv.u0, uv.v1),
            (uv.u1, uv.v1),
            (uv.u1, uv.v0),
            (uv.u0, uv.v0),
        ];
        let n = quad.face.normal();
        let x = quad.origin.x as f32;
        let y = quad.origin.y as f32;
        let z = quad.origin.z as f32;

        for i in 0..quad.width {
            for j in 0..quad.height {
                let verts = unit_quad_verts(quad.face, x, y, z, i as f32, j as f32);
                for v in &verts {
                    bb_min.x = bb_min.x.min(v.x);
                    bb_min.y = bb_min.y.min(v.y);
                    bb_min.z = bb_min.z.min(v.z);
                    bb_max.x = bb_max.x.max(v.x);
                    bb_max.y = bb_max.y.max(v.y);
                    bb_max.z = bb_max.z.max(v.z);
                }
                build.add_quad(verts, n, uvs);
            }
        }
    }

    if build.is_empty() {
        bb_min = Vec3::ZERO;
        bb_max = Vec3::ZERO;
    }
    ChunkMeshCpu {
        build,
        bbox: Aabb::from_min_max(bb_min, bb_max),
    }
}

/// Repeat-UV variant of the emitter: one quad per merged rectangle, with
/// UVs spanning `width x height` tile repeats. Only correct when the
/// embedder's atlas supports GPU-side repetition (a per-tile array
/// texture); with a packed atlas, use [`build_chunk_mesh`] instead.
pub fn build_chunk_mesh_repeat(quads: &[MergedQuad], atlas: &AtlasLayout) -> ChunkMeshCpu {
    let mut build = MeshBuild::default();
    build.reserve_quads(quads.len());

    let mut bb_min = Vec3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut bb_max = Vec3::new(f32::MIN, f32::MIN, f32::MIN);

    for quad in quads {
        let uv = atlas.tile_uv(quad.block_type);
        let (w, h) = (quad.width as f32, quad.height as f32);
        let du = (uv.u1 - uv.u0) * w;
        let dv = (uv.v1 - uv.v0) * h;
        let uvs = [
            (uv.u0, uv.v0 + dv),
            (uv.u0 + du, uv.v0 + dv),
            (uv.u0 + du, uv.v0),
            (uv.u0, uv.v0),
        ];
        let n = quad.face.normal();
        let x = quad.origin.x as f32;
        let y = quad.origin.y as f32;
        let z = quad.origin.z as f32;

        let verts = rect_verts(quad.face, x, y, z, w, h);
        for v in &verts {
            bb_min.x = bb_min.x.min(v.x);
            bb_min.y = bb_min.y.min(v.y);
            bb_min.z = bb_min.z.min(v.z);
            bb_max.x = bb_max.x.max(v.x);
            bb_max.y = bb_max.y.max(v.y);
            bb_max.z = bb_max.z.max(v.z);
        }
        build.add_quad(verts, n, uvs);
    }

    if build.is_empty() {
        bb_min = Vec3::ZERO;
        bb_max = Vec3::ZERO;
    }
    ChunkMeshCpu {
        build,
        bbox: Aabb::from_min_max(bb_min, bb_max),
    }
}

/// Corners of a whole `w x h` merged rectangle; same per-face tables as
/// [`unit_quad_verts`] stretched across the rectangle.
fn rect_verts(face: Face, x: f32, y: f32, z: f32, w: f32, h: f32) -> [Vec3; 4] {
    let s = HALF;
    // The stretch replaces the last unit's +s corner: a merged span of n
    // cells runs from -s to (n - 1) + s.
    let ew = w - 1.0;
    let eh = h - 1.0;
    match face {
        Face::Front => [
            Vec3::new(x - s, y - s, z + s),
            Vec3::new(x + s + ew, y - s, z + s),
            Vec3::new(x + s + ew, y + s + eh, z + s),
            Vec3::new(x - s, y + s + eh, z + s),
        ],
        Face::Back => [
            Vec3::new(x + s + ew, y - s, z - s),
            Vec3::new(x - s, y - s, z - s),
            Vec3::new(x - s, y + s + eh, z - s),
            Vec3::new(x + s + ew, y + s + eh, z - s),
        ],
        Face::Left => [
            Vec3::new(x - s, y - s, z - s),
            Vec3::new(x - s, y - s, z + s + ew),
            Vec3::new(x - s, y + s + eh, z + s + ew),
            Vec3::new(x - s, y + s + eh, z - s),
        ],
        Face::Right => [
            Vec3::new(x + s, y - s, z + s + ew),
            Vec3::new(x + s, y - s, z - s),
            Vec3::new(x + s, y + s + eh, z - s),
            Vec3::new(x + s, y + s + eh, z + s + ew),
        ],
        Face::Top => [
            Vec3::new(x - s, y + s, z + s + eh),
            Vec3::new(x + s + ew, y + s, z + s + eh),
            Vec3::new(x + s + ew, y + s, z - s),
            Vec3::new(x - s, y + s, z - s),
        ],
        Face::Bottom => [
            Vec3::new(x - s, y - s, z - s),
            Vec3::new(x + s + ew, y - s, z - s),
            Vec3::new(x + s + ew, y - s, z + s + eh),
            Vec3::new(x - s, y - s, z + s + eh),
        ],
    }
}

/// Four CCW corners (facing out) of the unit quad at offset `(i, j)`
/// within a merged rectangle. The (i, j) plane per direction matches the
/// merge: Front/Back i=X j=Y, Left/Right i=Z j=Y, Top/Bottom i=X j=Z.
/// Block centers sit at integer coordinates, so corners are at +/-0.5.
fn unit_quad_verts(face: Face, x: f32, y: f32, z: f32, i: f32, j: f32) -> [Vec3; 4] {
    let s = HALF;
    match face {
        Face::Front => [
            Vec3::new(x - s + i, y - s + j, z + s),
            Vec3::new(x + s + i, y - s + j, z + s),
            Vec3::new(x + s + i, y + s + j, z + s),
            Vec3::new(x - s + i, y + s + j, z + s),
        ],
        Face::Back => [
            Vec3::new(x + s + i, y - s + j, z - s),
            Vec3::new(x - s + i, y - s + j, z - s),
            Vec3::new(x - s + i, y + s + j, z - s),
            Vec3::new(x + s + i, y + s + j, z - s),
        ],
        Face::Left => [
            Vec3::new(x - s, y - s + j, z - s + i),
            Vec3::new(x - s, y - s + j, z + s + i),
            Vec3::new(x - s, y + s + j, z + s + i),
            Vec3::new(x - s, y + s + j, z - s + i),
        ],
        Face::Right => [
            Vec3::new(x + s, y - s + j, z + s + i),
            Vec3::new(x + s, y - s + j, z - s + i),
            Vec3::new(x + s, y + s + j, z - s + i),
            Vec3::new(x + s, y + s + j, z + s + i),
        ],
        Face::Top => [
            Vec3::new(x - s + i, y + s, z + s + j),
            Vec3::new(x + s + i, y + s, z + s + j),
            Vec3::new(x + s + i, y + s, z - s + j),
            Vec3::new(x - s + i, y + s, z - s + j),
        ],
        Face::Bottom => [
            Vec3::new(x - s + i, y - s, z - s + j),
            Vec3::new(x + s + i, y - s, z - s + j),
            Vec3::new(x + s + i, y - s, z + s + j),
            Vec3::new(x - s + i, y - s, z + s + j),
        ],
    }
}
