// smartmark/src/infrastructure/mod.rs
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod accounts;
pub mod di;
pub mod fanout;
pub mod memory;
pub mod sqlite;

/// Listener and storage state stays usable after a panicking holder.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
