//! `PostgreSQL` pool and schema.
//!
//! SYSTEM CONTEXT
//! ==============
//! Only the binary and the live database tests connect; the sync core sees
//! the database through [`crate::store::PgStore`]. Migrations are embedded at
//! compile time and applied before any session opens.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::DbConfig;

/// Embedded `documents` schema.
pub static MIGRATOR: Migrator = sqlx::migrate!("src/db/migrations");

/// Connect and migrate. `Ok(None)` when no database is configured.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(config: &DbConfig) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(database_url) = config.database_url.as_deref() else {
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    info!(max_connections = config.max_connections, "database ready");
    Ok(Some(pool))
}
