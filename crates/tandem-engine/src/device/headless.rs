use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

use super::{ContextAffinity, ContextError, GpuContext};

/// Context with affinity bookkeeping and no GPU behind it.
///
/// Used by tests and by the studio's headless mode. `refuse_make_current`
/// simulates a platform that cannot make a context current on a second thread.
#[derive(Debug)]
pub struct HeadlessContext {
    affinity: ContextAffinity,
    refuse_make_current: AtomicBool,
}

impl HeadlessContext {
    pub fn new(owner: ThreadId) -> Self {
        Self {
            affinity: ContextAffinity::new(owner),
            refuse_make_current: AtomicBool::new(false),
        }
    }

    /// Context owned by the calling thread.
    pub fn for_current_thread() -> Self {
        Self::new(std::thread::current().id())
    }

    pub fn refuse_make_current(&self, refuse: bool) {
        self.refuse_make_current.store(refuse, Ordering::SeqCst);
    }

    pub fn invalidate(&self) {
        self.affinity.invalidate();
    }
}

impl GpuContext for HeadlessContext {
    fn affinity(&self) -> &ContextAffinity {
        &self.affinity
    }

    fn label(&self) -> &str {
        "headless context"
    }

    fn make_current(&self) -> Result<(), ContextError> {
        if self.refuse_make_current.load(Ordering::SeqCst) {
            return Err(ContextError::Invalid);
        }
        self.affinity.make_current()
    }
}
