//! Per-vertex Lambert shading shared by the WGSL program and the headless
//! backend.

use crate::coords::Vec3;

/// Direction towards the light, before normalization.
pub const LIGHT_DIRECTION: Vec3 = Vec3::new(0.0, 0.3, 1.0);

/// Color of the logo.
pub const BASE_COLOR: Vec3 = Vec3::new(0.40, 1.0, 0.0);

pub const AMBIENT: f32 = 0.2;
pub const DIFFUSE: f32 = 0.8;

/// Vertex color for a normal: ambient + diffuse * max(n . l, 0), clamped.
pub fn lambert(normal: Vec3) -> [f32; 4] {
    let to_light = LIGHT_DIRECTION.normalized();
    let factor = normal.dot(to_light).max(0.0);
    let c = BASE_COLOR * AMBIENT + BASE_COLOR * (DIFFUSE * factor);
    [c.x.clamp(0.0, 1.0), c.y.clamp(0.0, 1.0), c.z.clamp(0.0, 1.0), 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_away_gets_ambient_only() {
        let c = lambert(Vec3::new(0.0, 0.0, -1.0));
        assert!((c[0] - 0.08).abs() < 1e-6);
        assert!((c[1] - 0.2).abs() < 1e-6);
        assert_eq!(c[3], 1.0);
    }

    #[test]
    fn facing_light_is_brightest() {
        let c = lambert(LIGHT_DIRECTION.normalized());
        assert!((c[1] - 1.0).abs() < 1e-5);
        assert!((c[0] - 0.4).abs() < 1e-5);
    }
}
