//! Persisted document model and change notifications.
//!
//! A document holds one opaque snapshot payload plus the bookkeeping needed
//! for last-writer-wins: a store-assigned `updated_at` and the identity of
//! the client that produced the payload. Readers must not assume anything
//! about the payload beyond "serializable snapshot".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::ClientId;

/// Stable identifier of a shared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One persisted revision of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Sibling field owned by the document-listing collaborator. Merge writes keep it.
    pub title: Option<String>,
    /// Sanitized snapshot, or `None` for a freshly created document.
    pub payload: Option<serde_json::Value>,
    /// Store-assigned write timestamp in milliseconds, strictly increasing per document.
    pub updated_at: i64,
    /// Client that produced `payload`.
    pub last_writer_id: Option<ClientId>,
}

/// Notification delivered to subscribers whenever any writer updates a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    pub document_id: DocumentId,
    pub payload: Option<serde_json::Value>,
    pub last_writer_id: Option<ClientId>,
    pub updated_at: i64,
}

impl From<&Document> for RemoteChange {
    fn from(doc: &Document) -> Self {
        Self {
            document_id: doc.id,
            payload: doc.payload.clone(),
            last_writer_id: doc.last_writer_id.clone(),
            updated_at: doc.updated_at,
        }
    }
}

/// Listing entry: everything but the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: Option<String>,
    pub updated_at: i64,
    pub last_writer_id: Option<ClientId>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            updated_at: doc.updated_at,
            last_writer_id: doc.last_writer_id.clone(),
        }
    }
}

/// Fields for creating a new, empty document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: Option<String>,
}

/// Options for [`crate::store::DocumentStore::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Keep fields this write does not touch (e.g. `title`).
    pub merge: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { merge: true }
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
