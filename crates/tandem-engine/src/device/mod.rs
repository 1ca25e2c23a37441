//! GPU context abstraction.
//!
//! This module is responsible for:
//! - the `GpuContext` contract consumed by the handoff protocol
//! - thread-affinity bookkeeping shared by every context implementation
//! - the headless context used by tests and the `--headless` demo
//! - the wgpu-backed context (device, queue, offscreen render target)
//! - the fatal error taxonomy of the render path

mod affinity;
mod context;
mod error;
mod gpu;
mod headless;
mod init;

pub use affinity::ContextAffinity;
pub use context::GpuContext;
pub use error::{abort_on_fatal, ContextError, FatalError, FatalHandler};
pub use gpu::{request_device, OffscreenTarget, WgpuContext, OFFSCREEN_COLOR_FORMAT, OFFSCREEN_DEPTH_FORMAT};
pub use headless::HeadlessContext;
pub use init::GpuInit;
