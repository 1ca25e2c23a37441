use std::time::Duration;

use crate::device::FatalError;

/// Counters published by the render thread after every invocation.
///
/// The owner thread only ever reads a snapshot; the render state itself stays
/// private to the render loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub frames_drawn: u64,
    /// Rotation angle after the last drawn frame, in degrees.
    pub angle: f32,
    /// Requests skipped because no context was installed yet.
    pub not_ready: u64,
    /// Requests abandoned because exit was requested.
    pub aborted: u64,
    pub last_interval: Duration,
    pub fps: Option<f32>,
    pub fatal: Option<FatalError>,
}
