//! Window hosting.
//!
//! Owns the `winit` event loop and window, presents the render thread's
//! offscreen frame to the swapchain, and drives a `GlWidget` from window
//! events.

mod compositor;
mod runtime;
mod surface;

pub use compositor::Compositor;
pub use runtime::{Runtime, RuntimeConfig};
pub use surface::{SurfaceAction, WindowSurface};
