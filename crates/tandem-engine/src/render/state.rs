use crate::coords::{ColorRgba, Mat4, Vec3};

/// Fixed offset applied after rotation and scale.
pub const MODEL_OFFSET: Vec3 = Vec3::new(-0.2, -0.2, 0.0);

/// Animation parameters. Owned and mutated by the render loop only.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    /// Rotation in degrees, applied around Y, X and Z in that order.
    pub angle: f32,
    pub scale: f32,
}

impl RenderState {
    pub fn new(scale: f32) -> Self {
        Self { angle: 0.0, scale }
    }

    /// Model transform for the current angle and scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::identity()
            .rotate(self.angle, Vec3::new(0.0, 1.0, 0.0))
            .rotate(self.angle, Vec3::new(1.0, 0.0, 0.0))
            .rotate(self.angle, Vec3::new(0.0, 0.0, 1.0))
            .scale(self.scale)
            .translate(MODEL_OFFSET)
    }

    /// Advances the rotation after a drawn frame.
    pub fn advance(&mut self, step: f32) {
        self.angle += step;
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameParams {
    pub frame_index: u64,
    pub clear_color: ColorRgba,
    pub model: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_transform_is_scale_then_offset() {
        let state = RenderState::new(2.0);
        let p = state.model_matrix().transform_point(Vec3::new(0.2, 0.2, 0.0));
        assert!(p.length() < 1e-6);
    }

    #[test]
    fn advance_accumulates_exactly() {
        let mut state = RenderState::default();
        for _ in 0..10 {
            state.advance(1.0);
        }
        assert_eq!(state.angle, 10.0);
    }
}
