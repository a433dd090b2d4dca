//! In-process document store.
//!
//! Timestamps come from the wall clock but are forced strictly increasing,
//! so two writes in the same millisecond still get a total order. Change
//! notifications fan out synchronously, after the store lock is released.
//! A document's listener entry is removed once its last subscriber leaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::debug;

use super::{ChangeListener, DocumentStore, StoreError};
use crate::document::{Document, DocumentId, DocumentSummary, NewDocument, RemoteChange, WriteOptions};
use crate::identity::ClientId;
use crate::listener::{ListenerSet, Subscription};

pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    available: AtomicBool,
}

#[derive(Default)]
struct MemoryInner {
    documents: HashMap<DocumentId, Document>,
    listeners: HashMap<DocumentId, ListenerSet<RemoteChange>>,
    last_timestamp: i64,
}

impl MemoryInner {
    fn next_timestamp(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::default(), available: AtomicBool::new(true) }
    }

    /// Simulate an outage: while unavailable every operation fails with
    /// [`StoreError::Unavailable`]. Existing subscriptions stay attached.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live subscriptions on `id`.
    #[must_use]
    pub fn subscriber_count(&self, id: DocumentId) -> usize {
        self.lock().listeners.get(&id).map_or(0, ListenerSet::len)
    }

    /// Deliver `change` to the subscribers of its document without storing it.
    #[cfg(test)]
    pub(crate) fn inject(&self, change: &RemoteChange) {
        let listeners = self.lock().listeners.get(&change.document_id).cloned();
        if let Some(listeners) = listeners {
            listeners.emit(change);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.ensure_available()?;
        Ok(self.lock().documents.get(&id).cloned())
    }

    async fn subscribe(&self, id: DocumentId, listener: ChangeListener) -> Result<Subscription, StoreError> {
        self.ensure_available()?;
        // Registered under the store lock so a concurrent prune cannot
        // orphan the set this listener joins.
        let registration = self
            .lock()
            .listeners
            .entry(id)
            .or_default()
            .register(move |change: &RemoteChange| listener(change));

        let store = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            registration.unsubscribe();
            if let Some(store) = store.upgrade() {
                let mut inner = store.lock().unwrap_or_else(PoisonError::into_inner);
                if inner.listeners.get(&id).is_some_and(ListenerSet::is_empty) {
                    inner.listeners.remove(&id);
                }
            }
        }))
    }

    async fn write(
        &self,
        id: DocumentId,
        payload: serde_json::Value,
        writer: &ClientId,
        options: WriteOptions,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;

        let (change, listeners) = {
            let mut inner = self.lock();
            let updated_at = inner.next_timestamp();
            let doc = inner.documents.entry(id).or_insert_with(|| Document {
                id,
                title: None,
                payload: None,
                updated_at,
                last_writer_id: None,
            });
            if !options.merge {
                doc.title = None;
            }
            doc.payload = Some(payload);
            doc.updated_at = updated_at;
            doc.last_writer_id = Some(writer.clone());

            let change = RemoteChange::from(&*doc);
            (change, inner.listeners.get(&id).cloned())
        };

        debug!(document_id = %id, writer = %writer, updated_at = change.updated_at, "memory store write");
        if let Some(listeners) = listeners {
            listeners.emit(&change);
        }
        Ok(())
    }

    async fn create(&self, fields: NewDocument) -> Result<DocumentId, StoreError> {
        self.ensure_available()?;
        let id = DocumentId::new();
        let mut inner = self.lock();
        let updated_at = inner.next_timestamp();
        inner.documents.insert(
            id,
            Document { id, title: fields.title, payload: None, updated_at, last_writer_id: None },
        );
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        self.ensure_available()?;
        let mut summaries: Vec<DocumentSummary> = self.lock().documents.values().map(DocumentSummary::from).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
