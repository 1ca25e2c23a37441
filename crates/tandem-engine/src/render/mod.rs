//! Render loop.
//!
//! Runs on the render thread. Each `Renderer::render` call takes the context
//! from the owner, draws one frame through a `LogoBackend`, and gives the
//! context back. Backends own their GPU resources (program, buffers).
//!
//! Convention:
//! - Geometry is in GL clip-space units; there is no projection.
//! - One buffer holds all positions followed by all normals.

mod backend;
mod headless;
mod logo;
mod renderer;
mod shader_lock;
mod shading;
mod state;
mod stats;
mod wgpu_backend;

pub use backend::LogoBackend;
pub use headless::{DrawLog, DrawRecord, FailStage, HeadlessBackend};
pub use logo::{BufferLayout, LogoMesh, DEFAULT_SECTORS};
pub use renderer::{FrameOutcome, RenderSettings, Renderer};
pub use shader_lock::shader_compile_lock;
pub use shading::lambert;
pub use state::{FrameParams, RenderState, MODEL_OFFSET};
pub use stats::RenderStats;
pub use wgpu_backend::WgpuLogoBackend;
