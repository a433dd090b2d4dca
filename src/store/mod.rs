//! Document store seam.
//!
//! DESIGN
//! ======
//! The sync core consumes a store through [`DocumentStore`] only: point
//! reads, per-document change subscriptions, tagged writes, plus document
//! creation and a recency-ordered listing (the latter two serve the listing
//! collaborator, never a sync session). Two backends ship with the crate:
//! [`memory::MemoryStore`] for in-process use and tests, and
//! [`postgres::PgStore`].
//!
//! ERROR HANDLING
//! ==============
//! Backends surface failures as [`StoreError`]. Sessions log them and move
//! on; no retry is attempted.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::document::{Document, DocumentId, DocumentSummary, NewDocument, RemoteChange, WriteOptions};
use crate::identity::ClientId;
use crate::listener::Subscription;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Callback invoked for every change to a subscribed document, including
/// the subscriber's own writes.
pub type ChangeListener = Box<dyn Fn(&RemoteChange) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current revision. `Ok(None)` means the document does not exist.
    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// Deliver every subsequent change of `id` to `listener` until the
    /// returned handle is unsubscribed or dropped.
    async fn subscribe(&self, id: DocumentId, listener: ChangeListener) -> Result<Subscription, StoreError>;

    /// Store `payload` as a new revision written by `writer`. With
    /// `options.merge` sibling fields survive; without it the document is
    /// replaced. Writing an absent document creates it.
    async fn write(
        &self,
        id: DocumentId,
        payload: serde_json::Value,
        writer: &ClientId,
        options: WriteOptions,
    ) -> Result<(), StoreError>;

    /// Create an empty document (`payload = None`).
    async fn create(&self, fields: NewDocument) -> Result<DocumentId, StoreError>;

    /// Every document, most recently updated first.
    async fn list(&self) -> Result<Vec<DocumentSummary>, StoreError>;
}
