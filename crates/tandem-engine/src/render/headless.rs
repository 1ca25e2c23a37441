use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::coords::{Mat4, Vec3};
use crate::device::{FatalError, GpuContext};

use super::shading::lambert;
use super::{BufferLayout, FrameParams, LogoBackend, LogoMesh};

/// Stage at which a `HeadlessBackend` can be told to fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailStage {
    ShaderCompile,
    ProgramLink,
    BufferBind,
    ProgramBind,
}

/// One recorded draw call.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub frame_index: u64,
    pub model: Mat4,
    pub thread: ThreadId,
    pub started: Instant,
    pub ended: Instant,
}

/// Everything the headless backend observed, shared with whoever created it.
#[derive(Debug, Default)]
pub struct DrawLog {
    pub initializations: u32,
    pub compile_intervals: Vec<(Instant, Instant)>,
    pub buffer: Option<BufferLayout>,
    pub uploaded_bytes: usize,
    pub shaded_vertices: usize,
    pub draws: Vec<DrawRecord>,
}

impl DrawLog {
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

/// Backend that runs the full draw sequence against CPU-side state.
///
/// It checks that the context is current on the calling thread before every
/// GPU-facing step, exactly like a GL driver would, and records what it did.
pub struct HeadlessBackend {
    context: Arc<dyn GpuContext>,
    log: Arc<Mutex<DrawLog>>,
    fail_at: Option<FailStage>,
    draw_time: Duration,
    compile_time: Duration,

    buffer: Option<Vec<u8>>,
    normals: Vec<Vec3>,
    linked: bool,
}

impl HeadlessBackend {
    pub fn new(context: Arc<dyn GpuContext>) -> Self {
        Self {
            context,
            log: Arc::new(Mutex::new(DrawLog::default())),
            fail_at: None,
            draw_time: Duration::ZERO,
            compile_time: Duration::ZERO,
            buffer: None,
            normals: Vec::new(),
            linked: false,
        }
    }

    /// Fails with the matching `FatalError` when `stage` is reached.
    pub fn fail_at(mut self, stage: FailStage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Simulated GPU time per draw.
    pub fn draw_time(mut self, time: Duration) -> Self {
        self.draw_time = time;
        self
    }

    /// Simulated shader compile time.
    pub fn compile_time(mut self, time: Duration) -> Self {
        self.compile_time = time;
        self
    }

    pub fn log(&self) -> Arc<Mutex<DrawLog>> {
        Arc::clone(&self.log)
    }

    fn check_current(&self, stage: &str) -> Result<(), FatalError> {
        self.context
            .affinity()
            .ensure_current()
            .map_err(|e| {
                log::error!("headless {stage} without a current context");
                FatalError::MakeCurrent(e)
            })
    }

    fn failing(&self, stage: FailStage) -> bool {
        self.fail_at == Some(stage)
    }
}

impl LogoBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn initialize(&mut self, mesh: &LogoMesh) -> Result<(), FatalError> {
        self.check_current("initialize")?;

        let started = Instant::now();
        if !self.compile_time.is_zero() {
            thread::sleep(self.compile_time);
        }
        self.log.lock().compile_intervals.push((started, Instant::now()));

        if self.failing(FailStage::ShaderCompile) {
            return Err(FatalError::ShaderCompile("injected failure".into()));
        }
        if self.failing(FailStage::ProgramLink) {
            return Err(FatalError::ProgramLink("injected failure".into()));
        }
        self.linked = true;

        if self.failing(FailStage::BufferBind) {
            return Err(FatalError::BufferBind("injected failure".into()));
        }

        let layout = mesh.layout();
        let bytes = mesh.to_bytes();
        debug_assert_eq!(bytes.len() as u64, layout.total_bytes);

        let mut log = self.log.lock();
        log.initializations += 1;
        log.buffer = Some(layout);
        log.uploaded_bytes = bytes.len();
        drop(log);

        self.normals = mesh.normals().to_vec();
        self.buffer = Some(bytes);
        Ok(())
    }

    fn draw(&mut self, frame: &FrameParams) -> Result<(), FatalError> {
        self.check_current("draw")?;
        let started = Instant::now();

        if !self.linked {
            return Err(FatalError::ProgramBind("program not linked".into()));
        }
        if self.failing(FailStage::ProgramBind) {
            return Err(FatalError::ProgramBind("injected failure".into()));
        }
        if self.buffer.is_none() {
            return Err(FatalError::BufferBind("vertex buffer missing".into()));
        }

        // Run the vertex stage's lighting so the shading path is exercised.
        let shaded = self.normals.iter().map(|n| lambert(*n)).count();

        if !self.draw_time.is_zero() {
            thread::sleep(self.draw_time);
        }
        self.check_current("draw")?;

        let mut log = self.log.lock();
        log.shaded_vertices += shaded;
        log.draws.push(DrawRecord {
            frame_index: frame.frame_index,
            model: frame.model,
            thread: thread::current().id(),
            started,
            ended: Instant::now(),
        });
        Ok(())
    }
}
