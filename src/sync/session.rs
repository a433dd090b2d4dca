//! Sync session: one client's binding of a live scene to one stored document.
//!
//! DESIGN
//! ======
//! `open` subscribes to the store *before* fetching the document, so no
//! revision can slip between the two; anything buffered that is not newer
//! than the fetched revision is dropped as stale. Every input (local
//! mutation, remote change, manual save, debounce deadline) is then handled
//! on a single task in arrival order, which keeps the Applying and Pending
//! states mutually exclusive without further locking.
//!
//! STATES
//! ======
//! `Loading` until the initial fetch settles, then `Synced`. A local
//! mutation moves to `Pending` until the write completes; applying a remote
//! revision moves to `Applying` and cancels any pending write, since the
//! incoming revision supersedes it. `Closed` once torn down.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here propagates to the host. Failed loads, writes and applies
//! are logged; the session keeps running and the apply guard is released
//! on every path.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::SyncError;
use super::debounce::{DebouncedWriter, SnapshotWriter, sleep_until_deadline};
use super::echo::EchoFilter;
use super::guard::ApplyGuard;
use crate::config::SyncConfig;
use crate::document::{DocumentId, RemoteChange, WriteOptions};
use crate::identity::ClientId;
use crate::listener::Subscription;
use crate::sanitize::PathSanitizer;
use crate::scene::{MutationEvent, SceneSerializer};
use crate::snapshot::Snapshot;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Loading,
    Synced,
    Applying,
    Pending,
}

enum Command {
    Mutation { at: Instant },
    Remote(RemoteChange),
    SaveNow(oneshot::Sender<Result<(), SyncError>>),
}

/// Handle to a running session. Dropping it stops the session without
/// waiting; [`SyncSession::close`] waits for teardown.
pub struct SyncSession {
    document_id: DocumentId,
    client_id: ClientId,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncSession {
    /// Bind `scene` to `document_id`.
    ///
    /// Resolves once the stored revision (if any) has been applied. Store
    /// and scene failures during open are logged, not returned: the
    /// session starts from whatever the scene holds and keeps syncing.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        scene: Arc<dyn SceneSerializer>,
        document_id: DocumentId,
        config: SyncConfig,
    ) -> Self {
        let client_id = config.client_id.clone().unwrap_or_else(ClientId::generate);
        let (state_tx, state_rx) = watch::channel(SessionState::Loading);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let guard = ApplyGuard::new();
        info!(document_id = %document_id, client_id = %client_id, "opening sync session");

        // PHASE: SUBSCRIBE
        let remote_tx = commands.clone();
        let remote = match store
            .subscribe(
                document_id,
                Box::new(move |change: &RemoteChange| {
                    if remote_tx.send(Command::Remote(change.clone())).is_err() {
                        trace!("remote change arrived after session stopped");
                    }
                }),
            )
            .await
        {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                error!(
                    document_id = %document_id,
                    error = %e,
                    code = e.error_code(),
                    "subscribe failed; remote changes will not be received"
                );
                None
            }
        };

        let options = WriteOptions { merge: config.merge_writes };
        let mut core = SessionCore {
            document_id,
            scene: Arc::clone(&scene),
            echo: EchoFilter::new(client_id.clone()),
            guard: guard.clone(),
            debounce: DebouncedWriter::new(config.debounce, guard.clone()),
            writer: SnapshotWriter::new(Arc::clone(&store), Arc::clone(&scene), document_id, client_id.clone(), options),
            sanitizer: PathSanitizer,
            last_revision: None,
            state: state_tx,
            queue_warn: config.queue_warn,
            backlog_warned: false,
        };

        // PHASE: LOAD
        core.load(store.as_ref()).await;

        // PHASE: HOOK
        // Checked synchronously: deserialize fires its events while the
        // guard is held, before control returns to the session task.
        let hook_tx = commands.clone();
        let hook_guard = guard;
        let mutations = scene.on_mutation(Box::new(move |event: MutationEvent| {
            if hook_guard.is_active() {
                trace!(?event, "mutation during remote apply ignored");
                return;
            }
            if hook_tx.send(Command::Mutation { at: Instant::now() }).is_err() {
                trace!("mutation arrived after session stopped");
            }
        }));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(core, command_rx, shutdown_rx, remote, mutations));

        Self {
            document_id,
            client_id,
            commands,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver for state transitions. Reads `Closed` after teardown.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Write the current scene now, cancelling any pending debounced write.
    ///
    /// # Errors
    ///
    /// The write's [`SyncError`], or [`SyncError::Closed`] if the session
    /// has stopped.
    pub async fn save_now(&self) -> Result<(), SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::SaveNow(reply))
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)?
    }

    /// Tear down: detach from the store and the scene, cancel any pending
    /// write, and wait for the session task to finish. No write or apply
    /// starts after this returns.
    pub async fn close(mut self) {
        self.signal_shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(document_id = %self.document_id, error = %e, "sync session task failed");
            }
        }
        info!(document_id = %self.document_id, client_id = %self.client_id, "sync session closed");
    }

    fn signal_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            if shutdown.send(()).is_err() {
                debug!(document_id = %self.document_id, "sync session already stopped");
            }
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

// =============================================================================
// SESSION TASK
// =============================================================================

struct SessionCore {
    document_id: DocumentId,
    scene: Arc<dyn SceneSerializer>,
    echo: EchoFilter,
    guard: ApplyGuard,
    debounce: DebouncedWriter,
    writer: SnapshotWriter,
    sanitizer: PathSanitizer,
    /// Newest `updated_at` observed from the store.
    last_revision: Option<i64>,
    state: watch::Sender<SessionState>,
    queue_warn: usize,
    backlog_warned: bool,
}

async fn run(
    mut core: SessionCore,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut shutdown: oneshot::Receiver<()>,
    remote: Option<Subscription>,
    mutations: Subscription,
) {
    loop {
        let deadline = core.debounce.deadline();
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            command = commands.recv() => match command {
                Some(command) => {
                    core.check_backlog(commands.len());
                    core.handle(command).await;
                }
                None => break,
            },
            () = sleep_until_deadline(deadline) => core.on_deadline().await,
        }
    }

    // PHASE: TEARDOWN
    if let Some(remote) = remote {
        remote.unsubscribe();
    }
    mutations.unsubscribe();
    if core.debounce.cancel() {
        debug!(document_id = %core.document_id, "pending write dropped on close");
    }
    core.set_state(SessionState::Closed);
}

impl SessionCore {
    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            trace!(document_id = %self.document_id, ?previous, ?state, "session state");
        }
    }

    fn check_backlog(&mut self, depth: usize) {
        if depth > self.queue_warn {
            if !self.backlog_warned {
                warn!(document_id = %self.document_id, depth, limit = self.queue_warn, "session queue backing up");
                self.backlog_warned = true;
            }
        } else {
            self.backlog_warned = false;
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Mutation { at } => self.on_mutation(at),
            Command::Remote(change) => self.on_remote(change).await,
            Command::SaveNow(reply) => {
                let result = self.write_snapshot().await;
                if let Err(e) = &result {
                    error!(document_id = %self.document_id, error = %e, code = e.error_code(), "manual save failed");
                }
                if reply.send(result).is_err() {
                    debug!(document_id = %self.document_id, "manual save caller went away");
                }
            }
        }
    }

    async fn load(&mut self, store: &dyn DocumentStore) {
        match store.get(self.document_id).await {
            Ok(Some(doc)) => {
                self.last_revision = Some(doc.updated_at);
                match doc.payload {
                    Some(payload) => {
                        if let Err(e) = self.apply(payload).await {
                            error!(document_id = %self.document_id, error = %e, code = e.error_code(), "initial snapshot not applied");
                        }
                    }
                    None => info!(document_id = %self.document_id, "document has no snapshot yet"),
                }
            }
            Ok(None) => info!(document_id = %self.document_id, "document not found; starting empty"),
            Err(e) => {
                error!(document_id = %self.document_id, error = %e, code = e.error_code(), "initial load failed; starting empty");
            }
        }
        self.set_state(SessionState::Synced);
    }

    fn on_mutation(&mut self, at: Instant) {
        if self.debounce.on_mutation(at) {
            self.set_state(SessionState::Pending);
        }
    }

    async fn on_remote(&mut self, change: RemoteChange) {
        if !self.echo.should_apply(&change) {
            trace!(document_id = %self.document_id, updated_at = change.updated_at, "own write echoed back");
            self.observe_revision(change.updated_at);
            return;
        }
        if self.last_revision.is_some_and(|seen| change.updated_at <= seen) {
            debug!(document_id = %self.document_id, updated_at = change.updated_at, "stale change dropped");
            return;
        }
        self.observe_revision(change.updated_at);

        let Some(payload) = change.payload else {
            debug!(document_id = %self.document_id, "remote change without snapshot ignored");
            return;
        };

        if self.debounce.cancel() {
            debug!(document_id = %self.document_id, "pending write superseded by remote revision");
        }
        match self.apply(payload).await {
            Ok(()) => debug!(
                document_id = %self.document_id,
                writer = ?change.last_writer_id.as_ref().map(ClientId::as_str),
                "remote snapshot applied"
            ),
            Err(e) => {
                error!(document_id = %self.document_id, error = %e, code = e.error_code(), "remote snapshot not applied");
            }
        }
        self.set_state(SessionState::Synced);
    }

    fn observe_revision(&mut self, updated_at: i64) {
        self.last_revision = Some(self.last_revision.map_or(updated_at, |seen| seen.max(updated_at)));
    }

    /// Decode, restore stroke paths, and hand the snapshot to the scene with
    /// the apply guard held.
    async fn apply(&mut self, payload: serde_json::Value) -> Result<(), SyncError> {
        let snapshot: Snapshot = serde_json::from_value(payload)?;
        let snapshot = self.sanitizer.restore(snapshot)?;
        let nodes = snapshot.node_count();

        self.set_state(SessionState::Applying);
        let scene = Arc::clone(&self.scene);
        self.guard.with_guard(|| scene.deserialize(snapshot)).await??;
        trace!(document_id = %self.document_id, nodes, "snapshot deserialized");
        Ok(())
    }

    async fn on_deadline(&mut self) {
        if !self.debounce.fire(Instant::now()) {
            return;
        }
        if let Err(e) = self.write_snapshot().await {
            error!(document_id = %self.document_id, error = %e, code = e.error_code(), "debounced write failed");
        }
    }

    async fn write_snapshot(&mut self) -> Result<(), SyncError> {
        self.debounce.cancel();
        let result = self.writer.write().await;
        self.set_state(SessionState::Synced);
        result
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
