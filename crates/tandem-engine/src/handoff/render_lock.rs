use parking_lot::{Condvar, Mutex};

/// Which side of the handoff holds the render lock.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    /// The GUI thread, composing or resizing.
    Owner,
    /// The render thread, drawing.
    Worker,
}

/// Render-serialization lock.
///
/// Unlike a `Mutex<()>` guard, acquisition and release can happen in
/// different callbacks (about-to-compose / frame-swapped), and the lock can be
/// handed from the owner straight to the worker during a context grant so no
/// composition slips in between the grant and the draw.
#[derive(Debug, Default)]
pub struct RenderLock {
    holder: Mutex<Option<Role>>,
    released: Condvar,
}

impl RenderLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock is free, then takes it for `role`.
    pub fn lock(&self, role: Role) {
        let mut holder = self.holder.lock();
        while holder.is_some() {
            self.released.wait(&mut holder);
        }
        *holder = Some(role);
    }

    pub fn try_lock(&self, role: Role) -> bool {
        let mut holder = self.holder.lock();
        if holder.is_some() {
            return false;
        }
        *holder = Some(role);
        true
    }

    /// Releases the lock held by `role`. Returns `false` (and leaves the lock
    /// untouched) if `role` does not hold it.
    pub fn unlock(&self, role: Role) -> bool {
        let mut holder = self.holder.lock();
        if *holder != Some(role) {
            log::warn!("render lock released by {role:?} but held by {:?}", *holder);
            return false;
        }
        *holder = None;
        self.released.notify_all();
        true
    }

    /// Transfers the lock from `from` to `to` without ever leaving it free.
    pub fn hand_over(&self, from: Role, to: Role) -> bool {
        let mut holder = self.holder.lock();
        if *holder != Some(from) {
            return false;
        }
        *holder = Some(to);
        true
    }

    pub fn holder(&self) -> Option<Role> {
        *self.holder.lock()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn lock_and_unlock_by_same_role() {
        let lock = RenderLock::new();
        lock.lock(Role::Owner);
        assert_eq!(lock.holder(), Some(Role::Owner));
        assert!(!lock.try_lock(Role::Worker));
        assert!(lock.unlock(Role::Owner));
        assert_eq!(lock.holder(), None);
    }

    #[test]
    fn unlock_by_wrong_role_is_ignored() {
        let lock = RenderLock::new();
        lock.lock(Role::Worker);
        assert!(!lock.unlock(Role::Owner));
        assert_eq!(lock.holder(), Some(Role::Worker));
    }

    #[test]
    fn hand_over_never_frees_the_lock() {
        let lock = RenderLock::new();
        lock.lock(Role::Owner);
        assert!(lock.hand_over(Role::Owner, Role::Worker));
        assert!(!lock.try_lock(Role::Owner));
        assert!(lock.unlock(Role::Worker));
    }

    #[test]
    fn lock_waits_for_release() {
        let lock = Arc::new(RenderLock::new());
        lock.lock(Role::Worker);

        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                lock.lock(Role::Owner);
                lock.unlock(Role::Owner)
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(lock.holder(), Some(Role::Worker));
        lock.unlock(Role::Worker);
        assert!(waiter.join().unwrap());
    }
}
