use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::coords::ColorRgba;
use crate::device::FatalError;
use crate::handoff::{ContextCoordinator, OwnerEvent};
use crate::time::FrameClock;

use super::{shader_compile_lock, FrameParams, LogoBackend, LogoMesh, RenderState, RenderStats, DEFAULT_SECTORS};

/// Tunables of the render loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Degrees added to the rotation after each drawn frame.
    pub rotation_step: f32,
    pub initial_scale: f32,
    pub clear_color: ColorRgba,
    /// Angular sectors of the logo ring.
    pub sectors: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            rotation_step: 1.0,
            initial_scale: 1.0,
            clear_color: ColorRgba::teal_backdrop(),
            sectors: DEFAULT_SECTORS,
        }
    }
}

/// Result of one render invocation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Drawn,
    /// No context or backend yet; the frame was skipped.
    NotReady,
    /// Exit was requested; nothing was drawn.
    Exiting,
}

/// The render loop object. Lives on, and is dropped by, the render thread.
pub struct Renderer {
    coordinator: Arc<ContextCoordinator>,
    settings: RenderSettings,
    backend: Option<Box<dyn LogoBackend>>,
    initialized: bool,
    state: RenderState,
    clock: FrameClock,
    stats: Arc<Mutex<RenderStats>>,
}

impl Renderer {
    pub fn new(
        coordinator: Arc<ContextCoordinator>,
        settings: RenderSettings,
        stats: Arc<Mutex<RenderStats>>,
    ) -> Self {
        let state = RenderState::new(settings.initial_scale);
        Self {
            coordinator,
            settings,
            backend: None,
            initialized: false,
            state,
            clock: FrameClock::new(),
            stats,
        }
    }

    /// Installs the backend. Its program and buffers are created on the next
    /// drawn frame.
    pub fn attach_backend(&mut self, backend: Box<dyn LogoBackend>) {
        log::debug!("attached {} backend", backend.name());
        self.backend = Some(backend);
        self.initialized = false;
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Renders one frame.
    ///
    /// Blocks inside `request_context` until the owner grants the context.
    /// Any error returned is fatal; the context has already been handed back
    /// to the owner by then.
    pub fn render(&mut self) -> Result<FrameOutcome, FatalError> {
        if self.coordinator.is_exiting() {
            return Ok(FrameOutcome::Exiting);
        }

        if self.coordinator.context().is_none() || self.backend.is_none() {
            self.stats.lock().not_ready += 1;
            return Ok(FrameOutcome::NotReady);
        }

        // The lease borrows the coordinator; keep that borrow off `self`.
        let coordinator = Arc::clone(&self.coordinator);
        let Some(lease) = coordinator.request_context() else {
            return Ok(self.abandoned());
        };

        // Shutdown may have raced with the grant.
        if coordinator.is_exiting() {
            drop(lease);
            return Ok(self.abandoned());
        }

        let me = thread::current().id();
        let context = lease.context();
        if context.thread() != me {
            return Err(FatalError::AffinityMismatch {
                expected: me,
                actual: context.thread(),
            });
        }
        if !context.is_valid() {
            return Err(FatalError::InvalidContext);
        }
        context.make_current().map_err(FatalError::MakeCurrent)?;

        self.ensure_initialized()?;

        let frame = FrameParams {
            frame_index: self.clock.frames(),
            clear_color: self.settings.clear_color,
            model: self.state.model_matrix(),
        };
        if let Some(backend) = self.backend.as_mut() {
            backend.draw(&frame)?;
        }
        self.state.advance(self.settings.rotation_step);

        let timing = self.clock.tick();
        log::debug!(
            "frame {} drawn, {:.2} ms since previous",
            timing.frame_index,
            timing.interval.as_secs_f64() * 1000.0
        );

        lease.release()?;

        {
            let mut stats = self.stats.lock();
            stats.frames_drawn += 1;
            stats.angle = self.state.angle;
            stats.last_interval = timing.interval;
            stats.fps = timing.fps();
        }

        // Queued; composition runs later on the owner thread.
        coordinator.notify_owner(OwnerEvent::UpdateRequested);
        Ok(FrameOutcome::Drawn)
    }

    fn abandoned(&self) -> FrameOutcome {
        if self.coordinator.is_exiting() {
            self.stats.lock().aborted += 1;
            FrameOutcome::Exiting
        } else {
            self.stats.lock().not_ready += 1;
            FrameOutcome::NotReady
        }
    }

    fn ensure_initialized(&mut self) -> Result<(), FatalError> {
        if self.initialized {
            return Ok(());
        }
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        let mesh = LogoMesh::build(self.settings.sectors);
        {
            let _compile = shader_compile_lock();
            backend.initialize(&mesh)?;
        }
        log::info!(
            "{} backend initialized ({} vertices)",
            backend.name(),
            mesh.vertex_count()
        );
        self.initialized = true;
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::debug!("renderer dropped after {} frames", self.clock.frames());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Weak;
    use std::thread::ThreadId;
    use std::time::Duration;

    use crossbeam_channel::{unbounded, Receiver};

    use super::*;
    use crate::device::{ContextAffinity, ContextError, GpuContext, HeadlessContext};
    use crate::handoff::NoopWaker;
    use crate::render::{FailStage, HeadlessBackend};

    struct Fixture {
        coordinator: Arc<ContextCoordinator>,
        events: Receiver<OwnerEvent>,
        context: Arc<HeadlessContext>,
        stats: Arc<Mutex<RenderStats>>,
    }

    fn fixture() -> Fixture {
        let (tx, rx) = unbounded();
        let coordinator = Arc::new(ContextCoordinator::new(tx, Arc::new(NoopWaker)));
        let context = Arc::new(HeadlessContext::for_current_thread());
        coordinator.install_context(context.clone());
        Fixture {
            coordinator,
            events: rx,
            context,
            stats: Arc::new(Mutex::new(RenderStats::default())),
        }
    }

    /// Runs `frames` renders on a worker while this thread grants the context.
    fn run_frames(
        fx: &Fixture,
        backend: HeadlessBackend,
        frames: usize,
    ) -> Vec<Result<FrameOutcome, FatalError>> {
        let worker = {
            let coordinator = Arc::clone(&fx.coordinator);
            let stats = Arc::clone(&fx.stats);
            thread::spawn(move || {
                let mut renderer = Renderer::new(coordinator, RenderSettings::default(), stats);
                renderer.attach_backend(Box::new(backend));
                (0..frames).map(|_| renderer.render()).collect::<Vec<_>>()
            })
        };
        fx.coordinator.set_worker_thread(worker.thread().id());

        while !worker.is_finished() {
            if let Ok(OwnerEvent::ContextWanted) = fx.events.recv_timeout(Duration::from_millis(10)) {
                fx.coordinator.grant_context().unwrap();
            }
        }
        worker.join().unwrap()
    }

    /// Context that raises the exit flag while the owner moves it to
    /// another thread, i.e. between grant and the render thread waking up.
    struct ExitOnGrant {
        inner: HeadlessContext,
        owner: ThreadId,
        coordinator: Weak<ContextCoordinator>,
    }

    impl GpuContext for ExitOnGrant {
        fn affinity(&self) -> &ContextAffinity {
            self.inner.affinity()
        }

        fn move_to_thread(&self, target: ThreadId) -> Result<(), ContextError> {
            if thread::current().id() == self.owner {
                if let Some(coordinator) = self.coordinator.upgrade() {
                    coordinator.raise_exit_flag();
                }
            }
            self.inner.move_to_thread(target)
        }
    }

    #[test]
    fn exit_observed_after_grant_skips_the_frame() {
        let (tx, rx) = unbounded();
        let coordinator = Arc::new(ContextCoordinator::new(tx, Arc::new(NoopWaker)));
        let context = Arc::new(ExitOnGrant {
            inner: HeadlessContext::for_current_thread(),
            owner: thread::current().id(),
            coordinator: Arc::downgrade(&coordinator),
        });
        coordinator.install_context(context.clone());
        let stats = Arc::new(Mutex::new(RenderStats::default()));
        let backend = HeadlessBackend::new(context.clone());
        let log = backend.log();

        let worker = {
            let coordinator = Arc::clone(&coordinator);
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                let mut renderer = Renderer::new(coordinator, RenderSettings::default(), stats);
                renderer.attach_backend(Box::new(backend));
                renderer.render()
            })
        };
        coordinator.set_worker_thread(worker.thread().id());

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(OwnerEvent::ContextWanted));
        assert_eq!(coordinator.grant_context(), Ok(true));
        assert_eq!(worker.join().unwrap(), Ok(FrameOutcome::Exiting));

        assert_eq!(log.lock().draw_count(), 0);
        assert_eq!(log.lock().initializations, 0);
        assert_eq!(stats.lock().aborted, 1);
        assert_eq!(context.thread(), thread::current().id());
        assert_eq!(context.current_thread(), None);
        assert_eq!(coordinator.render_lock_holder(), None);
        assert_eq!(context.affinity().violations(), 0);
    }

    #[test]
    fn not_ready_without_context() {
        let (tx, _rx) = unbounded();
        let coordinator = Arc::new(ContextCoordinator::new(tx, Arc::new(NoopWaker)));
        let stats = Arc::new(Mutex::new(RenderStats::default()));
        let mut renderer = Renderer::new(coordinator, RenderSettings::default(), stats.clone());
        assert_eq!(renderer.render(), Ok(FrameOutcome::NotReady));
        assert_eq!(stats.lock().not_ready, 1);
    }

    #[test]
    fn exiting_renderer_does_not_request_context() {
        let fx = fixture();
        fx.coordinator.prepare_exit();
        let mut renderer =
            Renderer::new(fx.coordinator.clone(), RenderSettings::default(), fx.stats.clone());
        renderer.attach_backend(Box::new(HeadlessBackend::new(fx.context.clone())));
        assert_eq!(renderer.render(), Ok(FrameOutcome::Exiting));
        assert!(fx.events.try_recv().is_err());
    }

    #[test]
    fn draws_accumulate_rotation_and_return_context() {
        let fx = fixture();
        let backend = HeadlessBackend::new(fx.context.clone());
        let log = backend.log();

        let results = run_frames(&fx, backend, 5);
        assert!(results.iter().all(|r| *r == Ok(FrameOutcome::Drawn)));

        let stats = fx.stats.lock().clone();
        assert_eq!(stats.frames_drawn, 5);
        assert_eq!(stats.angle, 5.0);

        let log = log.lock();
        assert_eq!(log.initializations, 1);
        assert_eq!(log.draw_count(), 5);
        assert_eq!(log.shaded_vertices, 5 * LogoMesh::default().vertex_count());

        assert_eq!(fx.context.thread(), thread::current().id());
        assert_eq!(fx.context.current_thread(), None);
        assert_eq!(fx.context.affinity().violations(), 0);
    }

    #[test]
    fn program_bind_failure_is_fatal_and_context_goes_home() {
        let fx = fixture();
        let backend = HeadlessBackend::new(fx.context.clone()).fail_at(FailStage::ProgramBind);
        let results = run_frames(&fx, backend, 1);
        assert!(matches!(results[0], Err(FatalError::ProgramBind(_))));
        assert_eq!(fx.context.thread(), thread::current().id());
        assert_eq!(fx.context.current_thread(), None);
        assert_eq!(fx.coordinator.render_lock_holder(), None);
    }

    #[test]
    fn shader_compile_failure_is_fatal() {
        let fx = fixture();
        let backend = HeadlessBackend::new(fx.context.clone()).fail_at(FailStage::ShaderCompile);
        let results = run_frames(&fx, backend, 1);
        assert!(matches!(results[0], Err(FatalError::ShaderCompile(_))));
    }

    #[test]
    fn refused_make_current_is_fatal() {
        let fx = fixture();
        fx.context.refuse_make_current(true);
        let backend = HeadlessBackend::new(fx.context.clone());
        let results = run_frames(&fx, backend, 1);
        assert!(matches!(results[0], Err(FatalError::MakeCurrent(_))));
        assert_eq!(fx.context.thread(), thread::current().id());
    }

    #[test]
    fn invalid_context_is_fatal() {
        let fx = fixture();
        fx.context.invalidate();
        let backend = HeadlessBackend::new(fx.context.clone());
        let results = run_frames(&fx, backend, 1);
        assert_eq!(results[0], Err(FatalError::InvalidContext));
    }
}
