//! The widget: owner-side half of the handoff.
//!
//! `GlWidget` lives on the GUI thread. It spawns the render thread, answers
//! its context requests, brackets composition and resizes with the render
//! lock, and tears everything down in order on drop. `HeadlessHarness` drives
//! a widget without a window, pacing composition like a vsync'd swap.

mod config;
mod gl_widget;
mod harness;
mod render_thread;

pub use config::WidgetConfig;
pub use gl_widget::GlWidget;
pub use harness::{HeadlessHarness, HeadlessReport};
pub use render_thread::{RenderCommand, RenderThread};
