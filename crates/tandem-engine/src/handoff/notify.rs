/// Events queued from the render thread to the owner thread.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OwnerEvent {
    /// The render thread is blocked waiting for the context.
    ContextWanted,
    /// A frame was drawn; the owner should schedule composition.
    UpdateRequested,
}

/// Nudges the owner thread's event loop after an `OwnerEvent` was queued.
///
/// Must not block: it is called from the render thread, possibly while the
/// handoff lock is held.
pub trait OwnerWaker: Send + Sync {
    fn wake(&self);
}

/// Waker for owners that poll their queue on their own schedule.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopWaker;

impl OwnerWaker for NoopWaker {
    fn wake(&self) {}
}

impl<F> OwnerWaker for F
where
    F: Fn() + Send + Sync,
{
    fn wake(&self) {
        self()
    }
}
