//! Math types shared by the logo geometry, the render loop and the backends.
//!
//! Conventions follow OpenGL: right-handed, angles in degrees at the API
//! surface, matrices column-major so they upload to WGSL `mat4x4<f32>` as-is.

mod color;
mod mat4;
mod vec3;

pub use color::ColorRgba;
pub use mat4::Mat4;
pub use vec3::Vec3;
