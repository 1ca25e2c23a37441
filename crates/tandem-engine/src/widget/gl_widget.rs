use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use crate::device::{ContextError, GpuContext};
use crate::handoff::{ContextCoordinator, OwnerEvent, OwnerWaker, Role};
use crate::render::{LogoBackend, RenderStats};

use super::{RenderCommand, RenderThread, WidgetConfig};

/// Owner-thread half of the context handoff.
///
/// Created on the GUI thread, which becomes the context's owner. The render
/// thread is started right away but stays idle until `initialize_gl`.
///
/// Host contract:
/// - call `on_about_to_compose` / `on_frame_swapped` around every composition
/// - call `on_about_to_resize` / `on_resized` around every surface resize
/// - call `process_events` whenever the waker fires
/// - schedule a composition whenever `take_update_request` returns `true`
pub struct GlWidget {
    config: WidgetConfig,
    coordinator: Arc<ContextCoordinator>,
    events: Receiver<OwnerEvent>,
    thread: Option<RenderThread>,
    stats: Arc<Mutex<RenderStats>>,
    update_pending: AtomicBool,
    size: (u32, u32),
}

impl GlWidget {
    pub fn new(config: WidgetConfig, waker: Arc<dyn OwnerWaker>) -> Result<Self> {
        let (tx, rx) = unbounded();
        let coordinator = Arc::new(ContextCoordinator::new(tx, waker));
        let stats = Arc::new(Mutex::new(RenderStats::default()));

        let thread = RenderThread::spawn(
            &config.thread_name,
            Arc::clone(&coordinator),
            config.render.clone(),
            Arc::clone(&stats),
            Arc::clone(&config.fatal_handler),
        )?;

        Ok(Self {
            size: config.min_size,
            config,
            coordinator,
            events: rx,
            thread: Some(thread),
            stats,
            update_pending: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<ContextCoordinator> {
        &self.coordinator
    }

    /// Installs the context and the backend the render thread draws with.
    ///
    /// The context must be owned by this thread. Rendering starts with the
    /// first composition.
    pub fn initialize_gl(
        &mut self,
        context: Arc<dyn GpuContext>,
        backend: Box<dyn LogoBackend>,
    ) -> Result<()> {
        if context.thread() != self.coordinator.owner_thread() {
            bail!("{} is not owned by the widget thread", context.label());
        }
        self.coordinator.install_context(context);

        let Some(thread) = self.thread.as_ref() else {
            bail!("render thread already stopped");
        };
        if !thread.send(RenderCommand::AttachBackend(backend)) {
            bail!("render thread is not accepting commands");
        }
        log::info!("widget initialized at {}x{}", self.size.0, self.size.1);
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Records a new size, clamped to the minimum. Returns the effective size.
    pub fn set_size(&mut self, width: u32, height: u32) -> (u32, u32) {
        self.size = self.config.clamp_size(width, height);
        self.size
    }

    // ── composition ───────────────────────────────────────────────────────

    /// Blocks until the render thread is not drawing, then keeps it out for
    /// the duration of the composition.
    pub fn on_about_to_compose(&self) {
        debug_assert_eq!(thread::current().id(), self.coordinator.owner_thread());
        self.coordinator.lock_rendering(Role::Owner);
    }

    /// Ends the composition and asks the render thread for the next frame.
    pub fn on_frame_swapped(&self) {
        self.coordinator.unlock_rendering(Role::Owner);
        self.request_render();
    }

    /// Runs `compose` between `on_about_to_compose` and `on_frame_swapped`
    /// with the context current on this thread.
    ///
    /// Without an installed context `compose` is not called, but the render
    /// thread is still kicked.
    pub fn compose_with<R>(
        &self,
        compose: impl FnOnce(&dyn GpuContext) -> R,
    ) -> Result<Option<R>, ContextError> {
        self.on_about_to_compose();

        let result = match self.coordinator.context() {
            Some(context) => match context.make_current() {
                Ok(()) => {
                    let out = compose(context.as_ref());
                    context.done_current();
                    Ok(Some(out))
                }
                Err(err) => Err(err),
            },
            None => Ok(None),
        };

        self.on_frame_swapped();
        result
    }

    pub fn request_render(&self) {
        if let Some(thread) = self.thread.as_ref() {
            thread.send(RenderCommand::Render);
        }
    }

    // ── resize ────────────────────────────────────────────────────────────

    pub fn on_about_to_resize(&self) {
        if !self.config.resize_settle.is_zero() {
            thread::sleep(self.config.resize_settle);
        }
        self.coordinator.lock_rendering(Role::Owner);
    }

    pub fn on_resized(&self) {
        self.coordinator.unlock_rendering(Role::Owner);
    }

    // ── owner events ──────────────────────────────────────────────────────

    /// Handles every queued render-thread event. Returns how many there were.
    pub fn process_events(&self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for one event and handles it.
    pub fn wait_event(&self, timeout: Duration) -> Option<OwnerEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns `true` once per `UpdateRequested` burst.
    pub fn take_update_request(&self) -> bool {
        self.update_pending.swap(false, Ordering::AcqRel)
    }

    fn handle_event(&self, event: OwnerEvent) {
        match event {
            OwnerEvent::ContextWanted => self.grant_context(),
            OwnerEvent::UpdateRequested => self.update_pending.store(true, Ordering::Release),
        }
    }

    fn grant_context(&self) {
        match self.coordinator.grant_context() {
            Ok(true) => {}
            Ok(false) => log::trace!("stale context request ignored"),
            Err(err) => {
                log::error!("could not hand the context over: {err}");
                self.stats.lock().fatal = Some(err.clone());
                (self.config.fatal_handler)(&err);
                self.coordinator.prepare_exit();
            }
        }
    }

    // ── teardown ──────────────────────────────────────────────────────────

    pub fn stats(&self) -> RenderStats {
        self.stats.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(RenderThread::is_running)
    }

    /// Stops the render thread and releases the context. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(mut thread) = self.thread.take() else {
            return;
        };

        self.coordinator.prepare_exit();
        thread.join();

        // Anything still queued is moot now.
        while self.events.try_recv().is_ok() {}

        if let Some(context) = self.coordinator.take_context() {
            context.done_current();
            if context.thread() != self.coordinator.owner_thread() {
                log::warn!("{} left on the render thread at shutdown", context.label());
            }
        }
        log::info!("widget shut down after {} frames", self.stats.lock().frames_drawn);
    }
}

impl Drop for GlWidget {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::device::HeadlessContext;
    use crate::handoff::NoopWaker;
    use crate::render::HeadlessBackend;

    fn widget() -> GlWidget {
        GlWidget::new(WidgetConfig::default(), Arc::new(NoopWaker)).unwrap()
    }

    #[test]
    fn render_thread_is_named_and_registered() {
        let w = widget();
        assert!(w.is_running());
        assert!(w.coordinator().worker_thread().is_some());
        assert_ne!(w.coordinator().worker_thread(), Some(thread::current().id()));
    }

    #[test]
    fn initialize_rejects_foreign_context() {
        let mut w = widget();
        let foreign = thread::spawn(HeadlessContext::for_current_thread).join().unwrap();
        let foreign: Arc<dyn GpuContext> = Arc::new(foreign);
        let backend = HeadlessBackend::new(Arc::clone(&foreign));
        assert!(w.initialize_gl(foreign, Box::new(backend)).is_err());
        assert!(w.coordinator().context().is_none());
    }

    #[test]
    fn set_size_clamps_to_minimum() {
        let mut w = widget();
        assert_eq!(w.size(), (300, 250));
        assert_eq!(w.set_size(10, 1000), (300, 1000));
    }

    #[test]
    fn compose_without_context_only_kicks_render() {
        let w = widget();
        let called = AtomicUsize::new(0);
        let out = w.compose_with(|_| called.fetch_add(1, Ordering::SeqCst));
        assert_eq!(out, Ok(None));
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(w.coordinator().render_lock_holder(), None);
    }

    #[test]
    fn waker_fires_for_context_request() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let waker = {
            let wakes = Arc::clone(&wakes);
            move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            }
        };
        let mut w = GlWidget::new(WidgetConfig::default(), Arc::new(waker)).unwrap();
        let ctx = Arc::new(HeadlessContext::for_current_thread());
        w.initialize_gl(ctx.clone(), Box::new(HeadlessBackend::new(ctx.clone())))
            .unwrap();
        w.request_render();

        assert_eq!(w.wait_event(Duration::from_secs(5)), Some(OwnerEvent::ContextWanted));
        assert!(wakes.load(Ordering::SeqCst) >= 1);

        assert_eq!(w.wait_event(Duration::from_secs(5)), Some(OwnerEvent::UpdateRequested));
        assert!(w.take_update_request());
        assert!(!w.take_update_request());
        assert_eq!(w.stats().frames_drawn, 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut w = widget();
        w.shutdown();
        assert!(!w.is_running());
        assert!(w.coordinator().is_exiting());
        w.shutdown();
    }
}
