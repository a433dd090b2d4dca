//! Runtime configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default; an unset or unparsable variable
//! falls back to it rather than failing startup.

use std::time::Duration;

use crate::identity::ClientId;

pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 800;
pub(crate) const DEFAULT_MERGE_WRITES: bool = true;
pub(crate) const DEFAULT_QUEUE_WARN: usize = 1024;
pub(crate) const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Tuning knobs for one sync session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period after the last local mutation before a write is issued.
    pub debounce: Duration,
    /// Whether writes merge into the stored document (keeping sibling fields
    /// such as the title) instead of replacing it.
    pub merge_writes: bool,
    /// Session queue depth above which a warning is logged.
    pub queue_warn: usize,
    /// Identity to reuse. A fresh one is generated on open when `None`.
    pub client_id: Option<ClientId>,
}

impl SyncConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            debounce: Duration::from_millis(env_parse("SCENESYNC_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)),
            merge_writes: env_parse("SCENESYNC_MERGE_WRITES", DEFAULT_MERGE_WRITES),
            queue_warn: env_parse("SCENESYNC_QUEUE_WARN", DEFAULT_QUEUE_WARN),
            client_id: None,
        }
    }

    /// Reuse an existing identity instead of generating one on open.
    #[must_use]
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            merge_writes: DEFAULT_MERGE_WRITES,
            queue_warn: DEFAULT_QUEUE_WARN,
            client_id: None,
        }
    }
}

/// Database settings. A missing `DATABASE_URL` selects the in-memory store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl DbConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(url),
            _ => None,
        };
        Self { database_url, max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS) }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
