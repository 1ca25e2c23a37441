use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

/// Misuse of a context's thread affinity.
///
/// These are reported by `ContextAffinity` whenever a caller tries to use the
/// context from a thread that does not currently own it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The calling thread is not the context's affinity thread.
    WrongThread { affinity: ThreadId, caller: ThreadId },
    /// The context is already current on another thread.
    CurrentElsewhere { current: ThreadId, caller: ThreadId },
    /// Affinity cannot change while the context is current somewhere.
    StillCurrent { on: ThreadId },
    /// The operation needs the context current on the calling thread.
    NotCurrent { caller: ThreadId },
    /// The context has been invalidated (device lost, surface destroyed).
    Invalid,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongThread { affinity, caller } => write!(
                f,
                "context belongs to thread {affinity:?}, used from {caller:?}"
            ),
            Self::CurrentElsewhere { current, caller } => write!(
                f,
                "context is current on {current:?}, cannot be made current on {caller:?}"
            ),
            Self::StillCurrent { on } => {
                write!(f, "context is still current on {on:?} and cannot change thread")
            }
            Self::NotCurrent { caller } => write!(f, "context is not current on {caller:?}"),
            Self::Invalid => f.write_str("context is not valid"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Unrecoverable render-path failures.
///
/// Every variant means the platform cannot support the cross-thread context
/// model or a GPU resource is broken; none of them are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// After the handoff the context still does not belong to the render thread.
    AffinityMismatch { expected: ThreadId, actual: ThreadId },
    /// The context reported itself invalid after the handoff.
    InvalidContext,
    /// The context could not be made current on the render thread.
    MakeCurrent(ContextError),
    /// Moving the context between threads failed.
    Transfer(ContextError),
    BufferBind(String),
    ShaderCompile(String),
    ProgramLink(String),
    ProgramBind(String),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AffinityMismatch { expected, actual } => write!(
                f,
                "failed to move context to the render thread (expected {expected:?}, found {actual:?})"
            ),
            Self::InvalidContext => f.write_str("context is invalid after handoff"),
            Self::MakeCurrent(e) => write!(f, "failed to make context current: {e}"),
            Self::Transfer(e) => write!(f, "failed to transfer context: {e}"),
            Self::BufferBind(msg) => write!(f, "failed to bind GPU buffer: {msg}"),
            Self::ShaderCompile(msg) => write!(f, "failed to compile shader: {msg}"),
            Self::ProgramLink(msg) => write!(f, "failed to link shader program: {msg}"),
            Self::ProgramBind(msg) => write!(f, "failed to bind shader program: {msg}"),
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MakeCurrent(e) | Self::Transfer(e) => Some(e),
            _ => None,
        }
    }
}

/// Receives fatal errors raised on the render thread.
pub type FatalHandler = Arc<dyn Fn(&FatalError) + Send + Sync>;

/// Default fatal policy: log and abort the process.
pub fn abort_on_fatal() -> FatalHandler {
    Arc::new(|err: &FatalError| {
        log::error!("fatal render error: {err}");
        std::process::abort();
    })
}
