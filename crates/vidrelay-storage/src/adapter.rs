// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the cursor store, media store, and post archive.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use vidrelay_config::model::StorageConfig;
use vidrelay_core::{
    ChannelHandle, ChannelPost, Cursor, CursorStore, HealthStatus, MediaRecord, MediaStore,
    MessageItem, PluginAdapter, PostArchive, RelayError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage.
///
/// The database is opened lazily by [`SqliteStorage::initialize`]; every
/// other operation fails with `RelayError::Storage` until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and runs migrations.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| RelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// The stored cursor for `channel_id`, distinguishing "never saved" from 0.
    pub async fn cursor(&self, channel_id: &str) -> Result<Option<Cursor>, RelayError> {
        queries::cursors::get_cursor(self.db()?, channel_id).await
    }

    pub async fn cursors(&self) -> Result<Vec<Cursor>, RelayError> {
        queries::cursors::list_cursors(self.db()?).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl CursorStore for SqliteStorage {
    async fn load(&self, channel_id: &str) -> Result<i64, RelayError> {
        Ok(self.cursor(channel_id).await?.map_or(0, |c| c.offset_id))
    }

    async fn save(&self, channel_id: &str, offset_id: i64) -> Result<(), RelayError> {
        queries::cursors::upsert_cursor(self.db()?, channel_id, offset_id).await
    }
}

#[async_trait]
impl MediaStore for SqliteStorage {
    async fn contains(&self, fingerprint: &str) -> Result<bool, RelayError> {
        queries::media::fingerprint_exists(self.db()?, fingerprint).await
    }

    async fn record(&self, record: &MediaRecord) -> Result<bool, RelayError> {
        queries::media::insert_media(self.db()?, record).await
    }

    async fn count(&self) -> Result<u64, RelayError> {
        queries::media::count_media(self.db()?).await
    }
}

#[async_trait]
impl PostArchive for SqliteStorage {
    async fn append(&self, post: &ChannelPost) -> Result<(), RelayError> {
        queries::posts::insert_post(self.db()?, post).await
    }

    async fn remember_channel(&self, channel: &ChannelHandle) -> Result<(), RelayError> {
        queries::posts::upsert_channel(self.db()?, channel).await
    }

    async fn find_channel(&self, name: &str) -> Result<Option<ChannelHandle>, RelayError> {
        queries::posts::find_channel(self.db()?, name).await
    }

    async fn page(
        &self,
        channel_id: i64,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageItem>, RelayError> {
        queries::posts::page_posts(self.db()?, channel_id, offset_id, limit).await
    }
}
