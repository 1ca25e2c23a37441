use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

use super::Vec3;

/// 4x4 matrix, column-major (`cols[c][r]`).
///
/// Builder methods post-multiply, so `Mat4::identity().rotate(a, y).scale(s)`
/// applies the scale first and the rotation last to a point.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    #[inline]
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    /// Rotation of `degrees` around `axis` (normalized internally).
    pub fn rotation(degrees: f32, axis: Vec3) -> Self {
        let a = axis.normalized();
        if a == Vec3::zero() {
            return Self::IDENTITY;
        }

        let (s, c) = degrees.to_radians().sin_cos();
        let t = 1.0 - c;

        Self {
            cols: [
                [t * a.x * a.x + c, t * a.x * a.y + s * a.z, t * a.x * a.z - s * a.y, 0.0],
                [t * a.x * a.y - s * a.z, t * a.y * a.y + c, t * a.y * a.z + s * a.x, 0.0],
                [t * a.x * a.z + s * a.y, t * a.y * a.z - s * a.x, t * a.z * a.z + c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn uniform_scale(factor: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = factor;
        m.cols[1][1] = factor;
        m.cols[2][2] = factor;
        m
    }

    pub fn translation(offset: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [offset.x, offset.y, offset.z, 1.0];
        m
    }

    #[inline]
    pub fn rotate(self, degrees: f32, axis: Vec3) -> Self {
        self * Self::rotation(degrees, axis)
    }

    #[inline]
    pub fn scale(self, factor: f32) -> Self {
        self * Self::uniform_scale(factor)
    }

    #[inline]
    pub fn translate(self, offset: Vec3) -> Self {
        self * Self::translation(offset)
    }

    /// Transforms a point (w = 1) and drops the resulting w.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * p.x + c[1][0] * p.y + c[2][0] * p.z + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[2][1] * p.z + c[3][1],
            c[0][2] * p.x + c[1][2] * p.y + c[2][2] * p.z + c[3][2],
        )
    }

    /// Largest absolute per-element difference; used for approximate comparisons.
    pub fn max_abs_diff(&self, other: &Mat4) -> f32 {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, cell) in col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4 { cols: out }
    }
}
