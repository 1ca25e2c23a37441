//! Static logo geometry.
//!
//! Two flat quads with their side walls form the inner mark; a ring of
//! `sectors` quads with inner and outer walls forms the circular band around
//! it. Every face is emitted as two triangles on the front plane (z = -0.05)
//! and two on the back plane (z = +0.05), with flat normals. Positions are
//! scaled by 2 at the end; normals are not.

use std::f32::consts::PI;
use std::mem::size_of;

use crate::coords::Vec3;

/// Number of ring sectors used by the demo.
pub const DEFAULT_SECTORS: usize = 100;

const HALF_DEPTH: f32 = 0.05;
const POSITION_SCALE: f32 = 2.0;
const RING_OUTER: f32 = 0.30;
const RING_INNER: f32 = 0.20;

/// Placement of the mesh inside a single GPU buffer: all positions, then all
/// normals, back to back.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferLayout {
    pub vertex_count: u32,
    /// Bytes of one attribute array (positions or normals).
    pub array_bytes: u64,
    pub normals_offset: u64,
    pub total_bytes: u64,
}

/// Immutable logo mesh: one normal per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoMesh {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl LogoMesh {
    pub fn build(sectors: usize) -> Self {
        let mut b = MeshBuilder::default();

        let (x1, y1) = (0.06, -0.14);
        let (x2, y2) = (0.14, -0.06);
        let (x3, y3) = (0.08, 0.00);
        let (x4, y4) = (0.30, 0.22);

        b.quad(x1, y1, x2, y2, y2, x2, y1, x1);
        b.quad(x3, y3, x4, y4, y4, x4, y3, x3);

        b.extrude(x1, y1, x2, y2);
        b.extrude(x2, y2, y2, x2);
        b.extrude(y2, x2, y1, x1);
        b.extrude(y1, x1, x1, y1);
        b.extrude(x3, y3, x4, y4);
        b.extrude(x4, y4, y4, x4);
        b.extrude(y4, x4, y3, x3);

        if sectors > 0 {
            let step = 2.0 * PI / sectors as f32;
            for i in 0..sectors {
                let a0 = i as f32 * step;
                let a1 = a0 + step;
                let (s0, c0) = a0.sin_cos();
                let (s1, c1) = a1.sin_cos();

                let (x5, y5) = (RING_OUTER * s0, RING_OUTER * c0);
                let (x6, y6) = (RING_INNER * s0, RING_INNER * c0);
                let (x7, y7) = (RING_INNER * s1, RING_INNER * c1);
                let (x8, y8) = (RING_OUTER * s1, RING_OUTER * c1);

                b.quad(x5, y5, x6, y6, x7, y7, x8, y8);
                b.extrude(x6, y6, x7, y7);
                b.extrude(x8, y8, x5, y5);
            }
        }

        for v in &mut b.vertices {
            *v = *v * POSITION_SCALE;
        }

        Self {
            vertices: b.vertices,
            normals: b.normals,
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn layout(&self) -> BufferLayout {
        let array_bytes = (self.vertices.len() * size_of::<Vec3>()) as u64;
        BufferLayout {
            vertex_count: self.vertices.len() as u32,
            array_bytes,
            normals_offset: array_bytes,
            total_bytes: array_bytes * 2,
        }
    }

    /// Positions and normals as one contiguous byte image matching `layout()`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.layout().total_bytes as usize);
        bytes.extend_from_slice(bytemuck::cast_slice(&self.vertices));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.normals));
        bytes
    }
}

impl Default for LogoMesh {
    fn default() -> Self {
        Self::build(DEFAULT_SECTORS)
    }
}

#[derive(Default)]
struct MeshBuilder {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl MeshBuilder {
    fn push_face(&mut self, corners: [Vec3; 6], normal: Vec3) {
        self.vertices.extend_from_slice(&corners);
        self.normals.extend_from_slice(&[normal; 6]);
    }

    #[allow(clippy::too_many_arguments)]
    fn quad(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32, x4: f32, y4: f32) {
        let front = -HALF_DEPTH;
        let back = HALF_DEPTH;

        let n = Vec3::normal(Vec3::new(x2 - x1, y2 - y1, 0.0), Vec3::new(x4 - x1, y4 - y1, 0.0));
        self.push_face(
            [
                Vec3::new(x1, y1, front),
                Vec3::new(x2, y2, front),
                Vec3::new(x4, y4, front),
                Vec3::new(x3, y3, front),
                Vec3::new(x4, y4, front),
                Vec3::new(x2, y2, front),
            ],
            n,
        );

        let n = Vec3::normal(Vec3::new(x2 - x4, y2 - y4, 0.0), Vec3::new(x1 - x4, y1 - y4, 0.0));
        self.push_face(
            [
                Vec3::new(x4, y4, back),
                Vec3::new(x2, y2, back),
                Vec3::new(x1, y1, back),
                Vec3::new(x2, y2, back),
                Vec3::new(x4, y4, back),
                Vec3::new(x3, y3, back),
            ],
            n,
        );
    }

    fn extrude(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let n = Vec3::normal(Vec3::new(x2 - x1, y2 - y1, 0.0), Vec3::new(0.0, 0.0, -0.1));
        self.push_face(
            [
                Vec3::new(x1, y1, HALF_DEPTH),
                Vec3::new(x2, y2, HALF_DEPTH),
                Vec3::new(x1, y1, -HALF_DEPTH),
                Vec3::new(x2, y2, -HALF_DEPTH),
                Vec3::new(x1, y1, -HALF_DEPTH),
                Vec3::new(x2, y2, HALF_DEPTH),
            ],
            n,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mesh_vertex_count() {
        // 2 quads * 12 + 7 walls * 6 + 100 sectors * (12 + 2 * 6)
        let mesh = LogoMesh::default();
        assert_eq!(mesh.vertex_count(), 24 + 42 + 100 * 24);
        assert_eq!(mesh.vertices().len(), mesh.normals().len());
    }

    #[test]
    fn layout_is_two_arrays_back_to_back() {
        let mesh = LogoMesh::build(8);
        let layout = mesh.layout();
        assert_eq!(layout.array_bytes, mesh.vertex_count() as u64 * 12);
        assert_eq!(layout.normals_offset, layout.array_bytes);
        assert_eq!(layout.total_bytes, 2 * layout.array_bytes);
        assert_eq!(mesh.to_bytes().len() as u64, layout.total_bytes);
    }

    #[test]
    fn positions_are_scaled_and_normals_are_unit() {
        let mesh = LogoMesh::default();
        for v in mesh.vertices() {
            assert!((v.z.abs() - 0.1).abs() < 1e-6, "z = {}", v.z);
        }
        for n in mesh.normals() {
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn ring_stays_within_outer_radius() {
        let mesh = LogoMesh::default();
        let max_r = mesh
            .vertices()
            .iter()
            .skip(24 + 42)
            .map(|v| (v.x * v.x + v.y * v.y).sqrt())
            .fold(0.0f32, f32::max);
        assert!((max_r - RING_OUTER * POSITION_SCALE).abs() < 1e-4, "max radius = {max_r}");
    }

    #[test]
    fn zero_sectors_keeps_inner_mark() {
        assert_eq!(LogoMesh::build(0).vertex_count(), 24 + 42);
    }

    #[test]
    fn front_and_back_normals_point_along_z() {
        let mesh = LogoMesh::build(4);
        // First face is the front of the first quad, second face its back.
        let front = mesh.normals()[0];
        let back = mesh.normals()[6];
        assert!(front.z.abs() > 0.99);
        assert!((front.z + back.z).abs() < 1e-5);
    }
}
