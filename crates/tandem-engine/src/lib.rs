//! Tandem engine crate.
//!
//! One GPU context shared by two threads: the GUI thread composes the window,
//! a dedicated render thread draws a rotating logo into the context's target.
//! The context is handed back and forth so it is never current on both.

pub mod coords;
pub mod device;
pub mod handoff;
pub mod logging;
pub mod render;
pub mod time;
pub mod widget;
pub mod window;
