//! COM surface loaded into Explorer: DLL exports, class factory and the explorer command.

pub mod context_menu;
mod dll;
mod guard;
mod module;

pub use context_menu::{CLSID_EXPLORER_COMMAND, ParallelCommandFactory, ParallelExplorerCommand};
pub use module::module_path;

use std::sync::atomic::{AtomicU32, Ordering};

/// Live explorer command objects plus outstanding `LockServer(TRUE)` calls.
static DLL_LOCK_COUNT: AtomicU32 = AtomicU32::new(0);

pub(crate) fn object_created() {
    DLL_LOCK_COUNT.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn object_released() {
    DLL_LOCK_COUNT.fetch_sub(1, Ordering::SeqCst);
}

pub(crate) fn lock_server() {
    DLL_LOCK_COUNT.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn unlock_server() {
    // Unbalanced unlocks from the host must not wrap the counter
    let _ = DLL_LOCK_COUNT.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
}

pub(crate) fn can_unload() -> bool {
    DLL_LOCK_COUNT.load(Ordering::SeqCst) == 0
}

/// Serializes tests that create explorer commands, since they all move the shared count.
#[cfg(test)]
pub(crate) fn serial_lock_count() -> std::sync::MutexGuard<'static, ()> {
    static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}
