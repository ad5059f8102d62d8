// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cursor record operations.

use rusqlite::{params, OptionalExtension};
use vidrelay_core::{Cursor, RelayError};

use crate::database::Database;

/// Returns the stored cursor for `channel_id`, if any.
pub async fn get_cursor(db: &Database, channel_id: &str) -> Result<Option<Cursor>, RelayError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT channel_id, offset_id FROM cursors WHERE channel_id = ?1",
                params![channel_id],
                |row| {
                    Ok(Cursor {
                        channel_id: row.get(0)?,
                        offset_id: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Inserts or replaces the cursor for `channel_id`.
pub async fn upsert_cursor(db: &Database, channel_id: &str, offset_id: i64) -> Result<(), RelayError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO cursors (channel_id, offset_id) VALUES (?1, ?2)
                 ON CONFLICT(channel_id) DO UPDATE SET
                    offset_id = excluded.offset_id,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![channel_id, offset_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All stored cursors, ordered by channel.
pub async fn list_cursors(db: &Database) -> Result<Vec<Cursor>, RelayError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT channel_id, offset_id FROM cursors ORDER BY channel_id")?;
            let cursors = stmt
                .query_map([], |row| {
                    Ok(Cursor {
                        channel_id: row.get(0)?,
                        offset_id: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(cursors)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
