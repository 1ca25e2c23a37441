use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::device::FatalHandler;
use crate::handoff::ContextCoordinator;
use crate::render::{FrameOutcome, LogoBackend, RenderSettings, RenderStats, Renderer};

/// Commands sent from the owner thread to the render thread.
pub enum RenderCommand {
    /// Draw one frame.
    Render,
    AttachBackend(Box<dyn LogoBackend>),
    Quit,
}

impl fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render => f.write_str("Render"),
            Self::AttachBackend(b) => f.debug_tuple("AttachBackend").field(&b.name()).finish(),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// The render thread and its command queue.
///
/// The `Renderer` is created on, and dropped by, the spawned thread.
pub struct RenderThread {
    handle: Option<JoinHandle<()>>,
    commands: Sender<RenderCommand>,
}

impl RenderThread {
    pub fn spawn(
        name: &str,
        coordinator: Arc<ContextCoordinator>,
        settings: RenderSettings,
        stats: Arc<Mutex<RenderStats>>,
        on_fatal: FatalHandler,
    ) -> Result<Self> {
        let (tx, rx) = unbounded();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn({
                let coordinator = Arc::clone(&coordinator);
                move || {
                    let renderer = Renderer::new(Arc::clone(&coordinator), settings, stats.clone());
                    run(rx, renderer, &coordinator, &stats, &on_fatal);
                }
            })
            .with_context(|| format!("failed to spawn render thread {name:?}"))?;

        coordinator.set_worker_thread(handle.thread().id());
        log::debug!("render thread {name:?} started");

        Ok(Self {
            handle: Some(handle),
            commands: tx,
        })
    }

    /// Queues a command. Returns `false` once the thread has exited.
    pub fn send(&self, command: RenderCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Asks the thread to quit and waits for it.
    pub fn join(&mut self) {
        let _ = self.commands.send(RenderCommand::Quit);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("render thread panicked");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.join();
    }
}

fn run(
    commands: Receiver<RenderCommand>,
    mut renderer: Renderer,
    coordinator: &ContextCoordinator,
    stats: &Mutex<RenderStats>,
    on_fatal: &FatalHandler,
) {
    let mut halted = false;

    while let Ok(command) = commands.recv() {
        match command {
            RenderCommand::Render if halted => {}
            RenderCommand::Render => match renderer.render() {
                Ok(FrameOutcome::Drawn) | Ok(FrameOutcome::NotReady) => {}
                Ok(FrameOutcome::Exiting) => log::debug!("render skipped, exiting"),
                Err(err) => {
                    log::error!("render thread stopped: {err}");
                    stats.lock().fatal = Some(err.clone());
                    halted = true;
                    on_fatal(&err);
                    coordinator.prepare_exit();
                }
            },
            RenderCommand::AttachBackend(backend) => renderer.attach_backend(backend),
            RenderCommand::Quit => break,
        }
    }

    log::debug!("render thread exiting at angle {}", renderer.state().angle);
}
