//! Debounced snapshot writes.
//!
//! [`DebouncedWriter`] owns the single cancellable deadline: every local
//! mutation pushes it to `event time + delay`, so a burst of edits collapses
//! into one write fired `delay` after the last of them. Mutations that land
//! while the [`ApplyGuard`] is held are ignored outright.
//!
//! [`SnapshotWriter`] is the write itself: serialize, sanitize stroke paths,
//! encode, and store under this client's id.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::SyncError;
use super::guard::ApplyGuard;
use crate::document::{DocumentId, WriteOptions};
use crate::identity::ClientId;
use crate::sanitize::PathSanitizer;
use crate::scene::{SceneSerializer, validate_snapshot};
use crate::store::DocumentStore;

// =============================================================================
// SCHEDULED TASK
// =============================================================================

/// A single replaceable deadline. Scheduling again supersedes the previous one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduledTask {
    deadline: Option<Instant>,
}

impl ScheduledTask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline to `at`. Returns true if a pending deadline was replaced.
    pub fn schedule(&mut self, at: Instant) -> bool {
        self.deadline.replace(at).is_some()
    }

    /// Clear the deadline. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clear and return true if the deadline has passed as of `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// DEBOUNCED WRITER
// =============================================================================

#[derive(Debug)]
pub struct DebouncedWriter {
    delay: Duration,
    guard: ApplyGuard,
    timer: ScheduledTask,
    timer_starts: u64,
}

impl DebouncedWriter {
    #[must_use]
    pub fn new(delay: Duration, guard: ApplyGuard) -> Self {
        Self { delay, guard, timer: ScheduledTask::new(), timer_starts: 0 }
    }

    /// Record a local mutation observed at `at`.
    ///
    /// Returns false, leaving any pending deadline untouched, while the apply
    /// guard is held.
    pub fn on_mutation(&mut self, at: Instant) -> bool {
        if self.guard.is_active() {
            return false;
        }
        let replaced = self.timer.schedule(at + self.delay);
        self.timer_starts += 1;
        debug!(replaced, delay_ms = self.delay.as_millis(), "write scheduled");
        true
    }

    /// Drop the pending write, if any.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }

    /// Returns true exactly once per deadline, when it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        self.timer.take_due(now)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// How many times a deadline was (re)started.
    #[must_use]
    pub fn timer_starts(&self) -> u64 {
        self.timer_starts
    }
}

// =============================================================================
// SNAPSHOT WRITER
// =============================================================================

/// Serializes the scene and stores it as this client's revision.
pub struct SnapshotWriter {
    store: Arc<dyn DocumentStore>,
    scene: Arc<dyn SceneSerializer>,
    sanitizer: PathSanitizer,
    document_id: DocumentId,
    client_id: ClientId,
    options: WriteOptions,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        scene: Arc<dyn SceneSerializer>,
        document_id: DocumentId,
        client_id: ClientId,
        options: WriteOptions,
    ) -> Self {
        Self { store, scene, sanitizer: PathSanitizer, document_id, client_id, options }
    }

    /// Write the current scene.
    ///
    /// A scene that could not be loaded back (non-finite geometry, missing
    /// required fields) is refused rather than stored lossily.
    ///
    /// # Errors
    ///
    /// [`SyncError::Scene`] if the scene would not survive a reload,
    /// [`SyncError::Encode`] if the snapshot cannot be encoded, or
    /// [`SyncError::Store`] if the store rejects the write.
    pub async fn write(&self) -> Result<(), SyncError> {
        let snapshot = self.scene.serialize();
        validate_snapshot(&snapshot)?;
        let strokes = snapshot.has_stroke_paths();
        let snapshot = self.sanitizer.sanitize(snapshot);
        let nodes = snapshot.node_count();
        let payload = serde_json::to_value(&snapshot)?;
        self.store
            .write(self.document_id, payload, &self.client_id, self.options)
            .await?;
        debug!(document_id = %self.document_id, nodes, strokes, "snapshot stored");
        Ok(())
    }
}

#[cfg(test)]
#[path = "debounce_test.rs"]
mod tests;
