use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use crate::device::{ContextError, GpuContext, HeadlessContext};
use crate::handoff::{NoopWaker, OwnerEvent};
use crate::render::{DrawLog, HeadlessBackend, RenderStats};

use super::{GlWidget, WidgetConfig};

/// Summary of a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessReport {
    pub stats: RenderStats,
    pub compositions: usize,
    pub draws: usize,
    pub transfers: u64,
    pub violations: u64,
    pub elapsed: Duration,
}

/// Drives a `GlWidget` with a `HeadlessContext`, standing in for a window
/// whose swap blocks for `vsync`.
///
/// The calling thread is the owner thread.
pub struct HeadlessHarness {
    widget: GlWidget,
    context: Arc<HeadlessContext>,
    draw_log: Arc<Mutex<DrawLog>>,
    compositions: Vec<(Instant, Instant)>,
    vsync: Duration,
    started: Instant,
}

impl HeadlessHarness {
    pub fn new(config: WidgetConfig, vsync: Duration) -> Result<Self> {
        Self::with_backend(config, vsync, HeadlessBackend::new)
    }

    /// Like `new`, but lets the caller configure the backend.
    pub fn with_backend(
        config: WidgetConfig,
        vsync: Duration,
        backend: impl FnOnce(Arc<dyn GpuContext>) -> HeadlessBackend,
    ) -> Result<Self> {
        let mut widget = GlWidget::new(config, Arc::new(NoopWaker))?;
        let context = Arc::new(HeadlessContext::for_current_thread());
        let shared: Arc<dyn GpuContext> = context.clone();
        let backend = backend(shared);
        let draw_log = backend.log();
        widget.initialize_gl(context.clone(), Box::new(backend))?;

        Ok(Self {
            widget,
            context,
            draw_log,
            compositions: Vec::new(),
            vsync,
            started: Instant::now(),
        })
    }

    pub fn widget(&self) -> &GlWidget {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut GlWidget {
        &mut self.widget
    }

    pub fn context(&self) -> &Arc<HeadlessContext> {
        &self.context
    }

    pub fn draw_log(&self) -> &Arc<Mutex<DrawLog>> {
        &self.draw_log
    }

    /// Start and end of every composition so far.
    pub fn compositions(&self) -> &[(Instant, Instant)] {
        &self.compositions
    }

    /// One composition: context current here for the length of a swap.
    pub fn compose(&mut self) -> Result<()> {
        let vsync = self.vsync;
        let window = self
            .widget
            .compose_with(|context| {
                let start = Instant::now();
                context.affinity().ensure_current()?;
                thread::sleep(vsync);
                Ok::<_, ContextError>((start, Instant::now()))
            })
            .context("owner could not make the context current")?;

        if let Some(window) = window {
            self.compositions.push(window.context("composition ran without the context")?);
        }
        Ok(())
    }

    /// Runs `cycles` compose/render round trips.
    ///
    /// Every cycle composes, then pumps owner events until the render thread
    /// reports a finished frame. Fails if it does not within `timeout`.
    pub fn run_cycles(&mut self, cycles: usize, timeout: Duration) -> Result<()> {
        for cycle in 0..cycles {
            self.compose()?;
            self.await_update(timeout)
                .with_context(|| format!("cycle {cycle} of {cycles}"))?;
        }
        Ok(())
    }

    fn await_update(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(fatal) = self.widget.stats().fatal {
                bail!("render thread stopped: {fatal}");
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                bail!("no frame within {timeout:?}");
            }
            match self.widget.wait_event(left.min(Duration::from_millis(50))) {
                Some(OwnerEvent::UpdateRequested) if self.widget.take_update_request() => {
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// Shuts the widget down and reports what happened.
    pub fn finish(mut self) -> HeadlessReport {
        self.widget.shutdown();
        let log = self.draw_log.lock();
        HeadlessReport {
            stats: self.widget.stats(),
            compositions: self.compositions.len(),
            draws: log.draw_count(),
            transfers: self.context.affinity().transfers(),
            violations: self.context.affinity().violations(),
            elapsed: self.started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_cycles_rotate_three_degrees() {
        let mut h = HeadlessHarness::new(WidgetConfig::default(), Duration::from_millis(1)).unwrap();
        h.run_cycles(3, Duration::from_secs(5)).unwrap();
        let report = h.finish();
        assert_eq!(report.stats.frames_drawn, 3);
        assert_eq!(report.stats.angle, 3.0);
        assert_eq!(report.draws, 3);
        assert_eq!(report.compositions, 3);
        // Out and back once per frame.
        assert_eq!(report.transfers, 6);
        assert_eq!(report.violations, 0);
    }
}
