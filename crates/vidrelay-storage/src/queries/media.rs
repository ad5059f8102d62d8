// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media library operations.

use rusqlite::params;
use vidrelay_core::{MediaRecord, RelayError};

use crate::database::Database;

pub async fn fingerprint_exists(db: &Database, fingerprint: &str) -> Result<bool, RelayError> {
    let fingerprint = fingerprint.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM media WHERE fingerprint = ?1)",
                params![fingerprint],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Inserts `record` unless its fingerprint is already present.
///
/// Returns `true` if a row was written.
pub async fn insert_media(db: &Database, record: &MediaRecord) -> Result<bool, RelayError> {
    let fingerprint = record.fingerprint();
    let media_ref = record.media_ref.0.clone();
    let caption = record.caption.clone();
    let size = record.size_bytes.and_then(|s| i64::try_from(s).ok());
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO media (fingerprint, media_ref, caption, size_bytes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![fingerprint, media_ref, caption, size],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_media(db: &Database) -> Result<u64, RelayError> {
    let count: i64 = db
        .connection()
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0)))
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(count.max(0) as u64)
}
