//! `PostgreSQL` document store.
//!
//! DESIGN
//! ======
//! Documents live in one `documents` table. Each write upserts the row and
//! issues `pg_notify` in the same transaction, so a notification is only
//! sent for committed revisions. Every subscription owns a `PgListener`
//! task that re-reads the row on notify and hands it to the listener;
//! unsubscribing aborts that task.
//!
//! TRADE-OFFS
//! ==========
//! Notifications carry only the document id. Two writes committed close
//! together may both be observed as the newer revision; sessions drop the
//! duplicate as stale by `updated_at`.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ChangeListener, DocumentStore, StoreError};
use crate::document::{Document, DocumentId, DocumentSummary, NewDocument, RemoteChange, WriteOptions};
use crate::identity::ClientId;
use crate::listener::Subscription;

/// `LISTEN`/`NOTIFY` channel carrying the id of each changed document.
pub const CHANGE_CHANNEL: &str = "document_changed";

const MERGE_UPSERT: &str = r"INSERT INTO documents (id, payload, updated_at, last_writer_id)
    VALUES ($1, $2, (extract(epoch FROM clock_timestamp()) * 1000)::bigint, $3)
    ON CONFLICT (id) DO UPDATE SET
        payload = EXCLUDED.payload,
        updated_at = GREATEST(EXCLUDED.updated_at, documents.updated_at + 1),
        last_writer_id = EXCLUDED.last_writer_id";

const REPLACE_UPSERT: &str = r"INSERT INTO documents (id, payload, updated_at, last_writer_id)
    VALUES ($1, $2, (extract(epoch FROM clock_timestamp()) * 1000)::bigint, $3)
    ON CONFLICT (id) DO UPDATE SET
        title = NULL,
        payload = EXCLUDED.payload,
        updated_at = GREATEST(EXCLUDED.updated_at, documents.updated_at + 1),
        last_writer_id = EXCLUDED.last_writer_id";

type DocumentRow = (Uuid, Option<String>, Option<serde_json::Value>, i64, Option<String>);
type SummaryRow = (Uuid, Option<String>, i64, Option<String>);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn fetch_document(pool: &PgPool, id: DocumentId) -> Result<Option<Document>, sqlx::Error> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, title, payload, updated_at, last_writer_id FROM documents WHERE id = $1",
    )
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, title, payload, updated_at, last_writer_id)| Document {
        id: DocumentId::from_uuid(id),
        title,
        payload,
        updated_at,
        last_writer_id: last_writer_id.map(ClientId::new),
    }))
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(fetch_document(&self.pool, id).await?)
    }

    async fn subscribe(&self, id: DocumentId, listener: ChangeListener) -> Result<Subscription, StoreError> {
        let mut pg_listener = PgListener::connect_with(&self.pool).await?;
        pg_listener.listen(CHANGE_CHANNEL).await?;

        let pool = self.pool.clone();
        let target = id.to_string();
        let task = tokio::spawn(async move {
            loop {
                let notification = match pg_listener.recv().await {
                    Ok(notification) => notification,
                    Err(e) => {
                        warn!(error = %e, document_id = %id, "change listener failed; subscription ended");
                        break;
                    }
                };
                if notification.payload() != target {
                    continue;
                }
                match fetch_document(&pool, id).await {
                    Ok(Some(doc)) => listener(&RemoteChange::from(&doc)),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, document_id = %id, "failed to load changed document"),
                }
            }
        });

        info!(document_id = %id, "subscribed to document changes");
        Ok(Subscription::new(move || task.abort()))
    }

    async fn write(
        &self,
        id: DocumentId,
        payload: serde_json::Value,
        writer: &ClientId,
        options: WriteOptions,
    ) -> Result<(), StoreError> {
        let upsert = if options.merge { MERGE_UPSERT } else { REPLACE_UPSERT };

        let mut tx = self.pool.begin().await?;
        sqlx::query(upsert)
            .bind(id.as_uuid())
            .bind(&payload)
            .bind(writer.as_str())
            .execute(tx.as_mut())
            .await?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(id.to_string())
            .execute(tx.as_mut())
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn create(&self, fields: NewDocument) -> Result<DocumentId, StoreError> {
        let id = DocumentId::new();
        sqlx::query("INSERT INTO documents (id, title) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(fields.title)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, title, updated_at, last_writer_id FROM documents ORDER BY updated_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title, updated_at, last_writer_id)| DocumentSummary {
                id: DocumentId::from_uuid(id),
                title,
                updated_at,
                last_writer_id: last_writer_id.map(ClientId::new),
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
