use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::ContextError;

#[derive(Debug)]
struct AffinityState {
    /// The only thread allowed to make the context current or move it.
    affinity: ThreadId,
    /// Thread the context is current on, if any.
    current: Option<ThreadId>,
    valid: bool,
    transfers: u64,
    violations: u64,
}

/// Thread-affinity bookkeeping for a GPU context.
///
/// Models the contract of a GL-style context: it has exactly one affinity
/// thread, may be current on at most one thread, and can only change affinity
/// while it is current nowhere. Every rejected operation is counted so tests
/// can assert that the handoff protocol never even attempted a violation.
#[derive(Debug)]
pub struct ContextAffinity {
    state: Mutex<AffinityState>,
}

impl ContextAffinity {
    pub fn new(owner: ThreadId) -> Self {
        Self {
            state: Mutex::new(AffinityState {
                affinity: owner,
                current: None,
                valid: true,
                transfers: 0,
                violations: 0,
            }),
        }
    }

    /// Affinity bound to the calling thread.
    pub fn for_current_thread() -> Self {
        Self::new(thread::current().id())
    }

    pub fn thread(&self) -> ThreadId {
        self.state.lock().affinity
    }

    pub fn current_thread(&self) -> Option<ThreadId> {
        self.state.lock().current
    }

    pub fn is_valid(&self) -> bool {
        self.state.lock().valid
    }

    pub fn invalidate(&self) {
        self.state.lock().valid = false;
    }

    /// Number of successful affinity changes.
    pub fn transfers(&self) -> u64 {
        self.state.lock().transfers
    }

    /// Number of rejected operations.
    pub fn violations(&self) -> u64 {
        self.state.lock().violations
    }

    /// Makes the context current on the calling thread.
    pub fn make_current(&self) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let mut st = self.state.lock();

        let result = if !st.valid {
            Err(ContextError::Invalid)
        } else if st.affinity != caller {
            Err(ContextError::WrongThread { affinity: st.affinity, caller })
        } else {
            match st.current {
                Some(current) if current != caller => {
                    Err(ContextError::CurrentElsewhere { current, caller })
                }
                _ => {
                    st.current = Some(caller);
                    Ok(())
                }
            }
        };

        if result.is_err() {
            st.violations += 1;
        }
        result
    }

    /// Makes the context not current, if it is current on the calling thread.
    ///
    /// Calling this from a thread the context is not current on is a no-op.
    pub fn done_current(&self) {
        let caller = thread::current().id();
        let mut st = self.state.lock();
        if st.current == Some(caller) {
            st.current = None;
        }
    }

    /// Returns `Ok` if the context is current on the calling thread.
    pub fn ensure_current(&self) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let st = self.state.lock();
        if st.current == Some(caller) {
            Ok(())
        } else {
            Err(ContextError::NotCurrent { caller })
        }
    }

    /// Reassigns the affinity thread. Must be called from the current affinity
    /// thread while the context is current nowhere.
    pub fn move_to_thread(&self, target: ThreadId) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let mut st = self.state.lock();

        let result = if st.affinity != caller {
            Err(ContextError::WrongThread { affinity: st.affinity, caller })
        } else if let Some(on) = st.current {
            Err(ContextError::StillCurrent { on })
        } else {
            if st.affinity != target {
                st.affinity = target;
                st.transfers += 1;
            }
            Ok(())
        };

        if result.is_err() {
            st.violations += 1;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_affinity_is_current_nowhere() {
        let a = ContextAffinity::for_current_thread();
        assert_eq!(a.thread(), thread::current().id());
        assert_eq!(a.current_thread(), None);
        assert!(a.is_valid());
    }

    #[test]
    fn make_current_from_other_thread_is_rejected() {
        let a = ContextAffinity::for_current_thread();
        let err = thread::scope(|s| s.spawn(|| a.make_current()).join().unwrap());
        assert!(matches!(err, Err(ContextError::WrongThread { .. })));
        assert_eq!(a.violations(), 1);
        assert_eq!(a.current_thread(), None);
    }

    #[test]
    fn cannot_move_while_current() {
        let a = ContextAffinity::for_current_thread();
        a.make_current().unwrap();
        let other = thread::scope(|s| s.spawn(|| thread::current().id()).join().unwrap());
        assert!(matches!(a.move_to_thread(other), Err(ContextError::StillCurrent { .. })));
        a.done_current();
        a.move_to_thread(other).unwrap();
        assert_eq!(a.thread(), other);
        assert_eq!(a.transfers(), 1);
    }

    #[test]
    fn moved_context_can_be_made_current_on_target_only() {
        let a = ContextAffinity::for_current_thread();
        let owner = thread::current().id();
        let (tx, rx) = crossbeam_channel::bounded::<()>(0);

        thread::scope(|s| {
            let worker = s.spawn(|| {
                rx.recv().unwrap();
                a.make_current().unwrap();
                assert_eq!(a.current_thread(), Some(thread::current().id()));
                a.done_current();
                a.move_to_thread(owner).unwrap();
            });
            a.move_to_thread(worker.thread().id()).unwrap();
            assert!(a.make_current().is_err());
            tx.send(()).unwrap();
            worker.join().unwrap();
        });

        assert_eq!(a.thread(), owner);
        assert_eq!(a.current_thread(), None);
        assert_eq!(a.transfers(), 2);
        assert_eq!(a.violations(), 1);
    }

    #[test]
    fn invalid_context_cannot_be_made_current() {
        let a = ContextAffinity::for_current_thread();
        a.invalidate();
        assert_eq!(a.make_current(), Err(ContextError::Invalid));
    }
}
