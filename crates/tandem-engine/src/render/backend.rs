use crate::device::FatalError;

use super::{FrameParams, LogoMesh};

/// GPU-side half of the render loop.
///
/// Both methods run on the render thread with the context current and the
/// render lock held. `initialize` additionally runs under the process-wide
/// shader compile lock.
pub trait LogoBackend: Send {
    fn name(&self) -> &str;

    /// Compiles and links the program, resolves attribute and uniform
    /// locations, and uploads `mesh` into one buffer laid out as
    /// `mesh.layout()` describes.
    fn initialize(&mut self, mesh: &LogoMesh) -> Result<(), FatalError>;

    /// Clears the target and draws the logo with `frame.model`.
    fn draw(&mut self, frame: &FrameParams) -> Result<(), FatalError>;
}
