//! Apply guard.
//!
//! Deserializing a remote snapshot fires the same mutation hooks as a local
//! edit. While the guard is held those hooks must not schedule a write,
//! otherwise every applied snapshot would be written straight back and two
//! clients would ping-pong forever.
//!
//! The flag is a shared `AtomicBool` so the mutation hook can test it
//! synchronously, inside the engine callback, while the deserialize future
//! is still running. Release happens in [`GuardToken`]'s `Drop`, which covers
//! success, error and cancellation alike.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("a remote snapshot is already being applied")]
    AlreadyApplying,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyGuard {
    active: Arc<AtomicBool>,
}

/// Held while a remote apply is in flight. Dropping it releases the guard.
#[derive(Debug)]
pub struct GuardToken {
    active: Arc<AtomicBool>,
}

impl ApplyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Take the guard.
    ///
    /// # Errors
    ///
    /// [`GuardError::AlreadyApplying`] if another apply holds it.
    pub fn try_enter(&self) -> Result<GuardToken, GuardError> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| GuardError::AlreadyApplying)?;
        Ok(GuardToken { active: Arc::clone(&self.active) })
    }

    /// Run `apply` with the guard held, releasing it however the future ends.
    ///
    /// `apply` is only invoked once the guard is taken, so any mutation the
    /// engine fires while building the future is already suppressed.
    ///
    /// # Errors
    ///
    /// [`GuardError::AlreadyApplying`] if another apply holds the guard; in
    /// that case `apply` is never called.
    pub async fn with_guard<F, Fut>(&self, apply: F) -> Result<Fut::Output, GuardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let _token = self.try_enter()?;
        Ok(apply().await)
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
