//! Frame pacing measurements.
//!
//! The render loop has no frame-rate limiter of its own: it is driven by the
//! owner's swap completions. `FrameClock` only observes the resulting cadence
//! so it can be logged and reported in `RenderStats`.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTiming};
