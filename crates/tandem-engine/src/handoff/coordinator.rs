use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex, RwLock};

use crate::device::{FatalError, GpuContext};

use super::{OwnerEvent, OwnerWaker, RenderLock, Role};

#[derive(Debug, Default)]
struct HandoffState {
    /// The worker is blocked in `request_context`.
    pending: bool,
    /// The owner moved the context to the worker and handed it the render lock.
    granted: bool,
}

/// Owns the single GPU context and the protocol that moves it between the
/// owner thread and the render thread.
///
/// Lock order is render lock, then handoff lock. The worker only ever holds the
/// handoff lock while it has not yet been granted the render lock, so the two
/// sides cannot deadlock.
pub struct ContextCoordinator {
    owner: ThreadId,
    worker: OnceLock<ThreadId>,
    context: RwLock<Option<Arc<dyn GpuContext>>>,

    render_lock: RenderLock,
    handoff: Mutex<HandoffState>,
    granted: Condvar,

    exiting: AtomicBool,

    events: Sender<OwnerEvent>,
    waker: Arc<dyn OwnerWaker>,
}

impl ContextCoordinator {
    /// Creates a coordinator owned by the calling thread.
    pub fn new(events: Sender<OwnerEvent>, waker: Arc<dyn OwnerWaker>) -> Self {
        Self {
            owner: thread::current().id(),
            worker: OnceLock::new(),
            context: RwLock::new(None),
            render_lock: RenderLock::new(),
            handoff: Mutex::new(HandoffState::default()),
            granted: Condvar::new(),
            exiting: AtomicBool::new(false),
            events,
            waker,
        }
    }

    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    pub fn worker_thread(&self) -> Option<ThreadId> {
        self.worker.get().copied()
    }

    /// Registers the render thread. Only the first registration counts.
    pub fn set_worker_thread(&self, worker: ThreadId) {
        if self.worker.set(worker).is_err() {
            log::warn!("render thread already registered; ignoring {worker:?}");
        }
    }

    /// Installs the context once the surface is usable.
    pub fn install_context(&self, context: Arc<dyn GpuContext>) {
        log::debug!("installing {}", context.label());
        *self.context.write() = Some(context);
    }

    /// The context, or `None` while the surface is not initialized.
    pub fn context(&self) -> Option<Arc<dyn GpuContext>> {
        self.context.read().clone()
    }

    /// Drops the coordinator's reference to the context.
    pub fn take_context(&self) -> Option<Arc<dyn GpuContext>> {
        self.context.write().take()
    }

    // ── render serialization ──────────────────────────────────────────────

    pub fn lock_rendering(&self, role: Role) {
        self.render_lock.lock(role);
    }

    pub fn unlock_rendering(&self, role: Role) -> bool {
        self.render_lock.unlock(role)
    }

    /// Scoped render lock.
    pub fn rendering(&self, role: Role) -> RenderingGuard<'_> {
        self.render_lock.lock(role);
        RenderingGuard { lock: &self.render_lock, role }
    }

    pub fn render_lock_holder(&self) -> Option<Role> {
        self.render_lock.holder()
    }

    // ── exit ──────────────────────────────────────────────────────────────

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    /// Sets the exiting flag without waking anyone. Usable while the handoff
    /// lock is held, where `prepare_exit` would deadlock.
    #[cfg(test)]
    pub(crate) fn raise_exit_flag(&self) {
        self.exiting.store(true, Ordering::SeqCst);
    }

    /// Sets the exiting flag and wakes a render thread blocked in
    /// `request_context`, which then returns without the context.
    pub fn prepare_exit(&self) {
        self.exiting.store(true, Ordering::SeqCst);
        let _st = self.handoff.lock();
        self.granted.notify_all();
    }

    // ── handoff ───────────────────────────────────────────────────────────

    /// Queues an event for the owner thread and wakes it.
    pub fn notify_owner(&self, event: OwnerEvent) -> bool {
        if self.events.send(event).is_err() {
            return false;
        }
        self.waker.wake();
        true
    }

    /// Asks the owner for the context and blocks until it is granted.
    ///
    /// Called on the render thread. Returns `None` when there is no context or
    /// when exit was requested before the grant arrived. On success the
    /// returned lease holds the render lock for the worker; dropping it hands
    /// the context back to the owner and frees the lock.
    pub fn request_context(&self) -> Option<ContextLease<'_>> {
        let context = self.context()?;

        let mut st = self.handoff.lock();
        st.pending = true;
        st.granted = false;

        if !self.notify_owner(OwnerEvent::ContextWanted) {
            log::debug!("owner event queue closed; not waiting for the context");
            st.pending = false;
            return None;
        }
        log::trace!("context wanted");

        while !st.granted && !self.is_exiting() {
            self.granted.wait(&mut st);
        }

        st.pending = false;
        if !st.granted {
            log::debug!("exit requested while waiting for the context");
            return None;
        }
        st.granted = false;
        drop(st);

        log::trace!("context granted");
        Some(ContextLease {
            coordinator: self,
            context,
            returned: false,
        })
    }

    /// Moves the context to the render thread in answer to `ContextWanted`.
    ///
    /// Called on the owner thread. Returns `Ok(false)` for stale requests
    /// (nothing pending, already granted, or exiting).
    pub fn grant_context(&self) -> Result<bool, FatalError> {
        let (Some(worker), Some(context)) = (self.worker_thread(), self.context()) else {
            return Ok(false);
        };

        self.render_lock.lock(Role::Owner);
        let mut st = self.handoff.lock();

        if !st.pending || st.granted || self.is_exiting() {
            drop(st);
            self.render_lock.unlock(Role::Owner);
            return Ok(false);
        }

        // Composition may have left the context current here.
        context.done_current();
        if let Err(err) = context.move_to_thread(worker) {
            drop(st);
            self.render_lock.unlock(Role::Owner);
            return Err(FatalError::Transfer(err));
        }

        st.granted = true;
        self.render_lock.hand_over(Role::Owner, Role::Worker);
        self.granted.notify_all();
        log::trace!("context moved to render thread");
        Ok(true)
    }
}

/// Render lock held for the duration of a scope.
pub struct RenderingGuard<'a> {
    lock: &'a RenderLock,
    role: Role,
}

impl Drop for RenderingGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock(self.role);
    }
}

/// Exclusive use of the context on the render thread.
///
/// Holds the render lock for the worker. `release` (or drop) makes the context
/// not current, moves it back to the owner thread and frees the render lock.
pub struct ContextLease<'a> {
    coordinator: &'a ContextCoordinator,
    context: Arc<dyn GpuContext>,
    returned: bool,
}

impl ContextLease<'_> {
    pub fn context(&self) -> &Arc<dyn GpuContext> {
        &self.context
    }

    /// Hands the context back to the owner thread.
    pub fn release(mut self) -> Result<(), FatalError> {
        self.give_back()
    }

    fn give_back(&mut self) -> Result<(), FatalError> {
        if self.returned {
            return Ok(());
        }
        self.returned = true;

        self.context.done_current();

        // After a failed transfer the context never reached this thread and
        // there is nothing to move back.
        if self.context.thread() != thread::current().id() {
            return Ok(());
        }

        self.context
            .move_to_thread(self.coordinator.owner)
            .map_err(FatalError::Transfer)?;
        log::trace!("context returned to owner thread");
        Ok(())
    }
}

impl Drop for ContextLease<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.give_back() {
            log::error!("{err}");
        }
        self.coordinator.render_lock.unlock(Role::Worker);
    }
}
