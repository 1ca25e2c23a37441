use std::thread::ThreadId;

use super::{ContextAffinity, ContextError};

/// A GPU context that can be handed between threads.
///
/// The handoff protocol never constructs contexts; it only borrows one through
/// this trait and moves it between the owner and render threads. Implementors
/// expose their `ContextAffinity` and may override the provided methods to bind
/// or unbind platform state alongside the bookkeeping.
pub trait GpuContext: Send + Sync {
    fn affinity(&self) -> &ContextAffinity;

    /// Short name used in log messages.
    fn label(&self) -> &str {
        "gpu context"
    }

    /// The thread the context is currently permitted to be made current on.
    fn thread(&self) -> ThreadId {
        self.affinity().thread()
    }

    fn current_thread(&self) -> Option<ThreadId> {
        self.affinity().current_thread()
    }

    fn is_valid(&self) -> bool {
        self.affinity().is_valid()
    }

    /// Binds the context (and its render target) to the calling thread.
    fn make_current(&self) -> Result<(), ContextError> {
        self.affinity().make_current()
    }

    fn done_current(&self) {
        self.affinity().done_current();
    }

    fn move_to_thread(&self, target: ThreadId) -> Result<(), ContextError> {
        self.affinity().move_to_thread(target)
    }
}
