use parking_lot::{const_mutex, Mutex, MutexGuard};

// Some drivers misbehave when shaders are compiled on several threads at once,
// even for unrelated contexts.
static SHADER_COMPILE_LOCK: Mutex<()> = const_mutex(());

/// Process-wide lock held while a backend compiles and links its program.
pub fn shader_compile_lock() -> MutexGuard<'static, ()> {
    SHADER_COMPILE_LOCK.lock()
}
