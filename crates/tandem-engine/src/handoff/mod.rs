//! Context ownership coordination.
//!
//! One GPU context, two threads. The owner (GUI) thread composes the window;
//! the worker (render) thread draws into the context's target. This module
//! provides the render-serialization lock that keeps the two apart and the
//! request/grant/release protocol that moves the context between them so it
//! is never current on two threads at once.

mod coordinator;
mod notify;
mod render_lock;

pub use coordinator::{ContextCoordinator, ContextLease, RenderingGuard};
pub use notify::{NoopWaker, OwnerEvent, OwnerWaker};
pub use render_lock::{RenderLock, Role};
