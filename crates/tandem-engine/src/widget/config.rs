use std::fmt;
use std::time::Duration;

use crate::device::{abort_on_fatal, FatalHandler};
use crate::render::RenderSettings;

/// Widget configuration.
#[derive(Clone)]
pub struct WidgetConfig {
    pub render: RenderSettings,
    /// Smallest size of the widget, in logical pixels.
    pub min_size: (u32, u32),
    /// Pause before taking the render lock for a resize.
    pub resize_settle: Duration,
    pub thread_name: String,
    /// Called once with the first fatal render error.
    pub fatal_handler: FatalHandler,
}

impl WidgetConfig {
    pub fn with_fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.fatal_handler = handler;
        self
    }

    /// Clamps a requested size to `min_size`.
    pub fn clamp_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.max(self.min_size.0), height.max(self.min_size.1))
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            render: RenderSettings::default(),
            min_size: (300, 250),
            resize_settle: Duration::from_millis(10),
            thread_name: "tandem-render".to_string(),
            fatal_handler: abort_on_fatal(),
        }
    }
}

impl fmt::Debug for WidgetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetConfig")
            .field("render", &self.render)
            .field("min_size", &self.min_size)
            .field("resize_settle", &self.resize_settle)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}
