// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel post archive operations.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use vidrelay_core::{
    ChannelHandle, ChannelPost, Media, MediaKind, MediaRef, MessageItem, RelayError,
};

use crate::database::Database;

/// Records `post`, refreshing the channel row. Re-archiving the same
/// message id replaces the stored copy (edited posts).
pub async fn insert_post(db: &Database, post: &ChannelPost) -> Result<(), RelayError> {
    let channel = post.channel.clone();
    let item = post.item.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            upsert_channel_row(&tx, &channel)?;
            let media = item.media.as_ref();
            tx.execute(
                "INSERT OR REPLACE INTO channel_posts
                    (channel_id, message_id, media_kind, media_ref, size_bytes, caption)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    channel.id,
                    item.id,
                    media.map(|m| m.kind.to_string()),
                    media.map(|m| m.media_ref.0.clone()),
                    media.and_then(|m| m.size_bytes).and_then(|s| i64::try_from(s).ok()),
                    item.caption,
                ],
            )?;
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Records or refreshes a channel row on its own.
pub async fn upsert_channel(db: &Database, channel: &ChannelHandle) -> Result<(), RelayError> {
    let channel = channel.clone();
    db.connection()
        .call(move |conn| upsert_channel_row(conn, &channel).map(|_| ()))
        .await
        .map_err(crate::database::map_tr_err)
}

fn upsert_channel_row(conn: &Connection, channel: &ChannelHandle) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO channels (id, title, username) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            username = excluded.username,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![channel.id, channel.title, channel.username],
    )
}

/// Looks a channel up by username (leading `@` ignored) or exact title.
///
/// Username matches win over title matches.
pub async fn find_channel(db: &Database, name: &str) -> Result<Option<ChannelHandle>, RelayError> {
    let title = name.to_string();
    let username = name.trim_start_matches('@').to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, title, username FROM channels
                 WHERE username = ?1 OR title = ?2
                 ORDER BY (username = ?1) DESC, updated_at DESC
                 LIMIT 1",
                params![username, title],
                |row| {
                    Ok(ChannelHandle {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        username: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Up to `limit` posts of `channel_id`, newest first.
///
/// `offset_id == 0` starts at the newest post, otherwise at `id <= offset_id`.
pub async fn page_posts(
    db: &Database,
    channel_id: i64,
    offset_id: i64,
    limit: usize,
) -> Result<Vec<MessageItem>, RelayError> {
    let upper = if offset_id <= 0 { i64::MAX } else { offset_id };
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, channel_id, media_kind, media_ref, size_bytes, caption
                 FROM channel_posts
                 WHERE channel_id = ?1 AND message_id <= ?2
                 ORDER BY message_id DESC
                 LIMIT ?3",
            )?;
            let items = stmt
                .query_map(params![channel_id, upper, limit], row_to_item)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<MessageItem> {
    let kind: Option<String> = row.get(2)?;
    let media_ref: Option<String> = row.get(3)?;
    let size: Option<i64> = row.get(4)?;
    let media = match (kind, media_ref) {
        (Some(kind), Some(media_ref)) => Some(Media {
            kind: MediaKind::from_str(&kind).unwrap_or(MediaKind::Other),
            media_ref: MediaRef(media_ref),
            size_bytes: size.and_then(|s| u64::try_from(s).ok()),
        }),
        _ => None,
    };
    Ok(MessageItem {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        media,
        caption: row.get(5)?,
    })
}
