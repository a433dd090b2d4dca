//! Document synchronization core.
//!
//! ARCHITECTURE
//! ============
//! [`session::SyncSession`] is the composition root. It owns the client
//! identity, the [`guard::ApplyGuard`], the [`debounce::DebouncedWriter`]
//! and both subscriptions (store changes in, scene mutations out), and runs
//! them on one task so every event is handled in arrival order.
//!
//! ```text
//! local edit ─▶ mutation hook ─(guard idle)─▶ debounce ─▶ serialize ─▶ sanitize ─▶ store.write
//! store change ─▶ echo filter ─▶ stale check ─▶ restore ─▶ guard { deserialize }
//! ```

pub mod debounce;
pub mod echo;
pub mod guard;
pub mod session;

pub use debounce::{DebouncedWriter, ScheduledTask, SnapshotWriter};
pub use echo::EchoFilter;
pub use guard::{ApplyGuard, GuardError};
pub use session::{SessionState, SyncSession};

use crate::sanitize::SanitizeError;
use crate::scene::SceneError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sync session is closed")]
    Closed,
}

impl SyncError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Scene(e) => e.error_code(),
            Self::Sanitize(e) => e.error_code(),
            Self::Guard(_) => "E_GUARD_BUSY",
            Self::Encode(_) => "E_ENCODE",
            Self::Closed => "E_SESSION_CLOSED",
        }
    }
}
