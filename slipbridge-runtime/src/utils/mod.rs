use std::sync::{Mutex, MutexGuard, PoisonError};

/// Test doubles for the collaborator traits in `link`.
pub mod test;

/// Locks `mutex`, carrying on with the inner value if another thread panicked while holding
/// it. Every critical section in the bridge leaves its data consistent between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
