// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of incoming updates into archive and library records.
//!
//! Channel posts are archived so they can be paged later. Videos that
//! operators send to the bot directly go into the media library.

use teloxide::types::{Chat, Message};
use tracing::{debug, warn};
use vidrelay_core::{
    ChannelHandle, ChannelPost, Media, MediaKind, MediaRecord, MediaRef, MediaStore, MessageItem,
    PostArchive, RelayError,
};

/// Handle for a chat as the relay sees it. Untitled chats fall back to their id.
pub fn channel_handle(chat: &Chat) -> ChannelHandle {
    ChannelHandle {
        id: chat.id.0,
        title: chat
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| chat.id.0.to_string()),
        username: chat.username().map(str::to_string),
    }
}

/// The media attached to `msg`, if any.
///
/// Documents with a `video/*` MIME type count as videos.
pub fn extract_media(msg: &Message) -> Option<Media> {
    if let Some(video) = msg.video() {
        return Some(Media {
            kind: MediaKind::Video,
            media_ref: MediaRef(video.file.id.to_string()),
            size_bytes: Some(u64::from(video.file.size)),
        });
    }
    if let Some(doc) = msg.document() {
        let is_video = doc
            .mime_type
            .as_ref()
            .is_some_and(|m| m.to_string().starts_with("video/"));
        return Some(Media {
            kind: if is_video {
                MediaKind::Video
            } else {
                MediaKind::Document
            },
            media_ref: MediaRef(doc.file.id.to_string()),
            size_bytes: Some(u64::from(doc.file.size)),
        });
    }
    if let Some(largest) = msg.photo().and_then(|p| p.last()) {
        return Some(Media {
            kind: MediaKind::Photo,
            media_ref: MediaRef(largest.file.id.to_string()),
            size_bytes: Some(u64::from(largest.file.size)),
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(Media {
            kind: MediaKind::Other,
            media_ref: MediaRef(animation.file.id.to_string()),
            size_bytes: Some(u64::from(animation.file.size)),
        });
    }
    None
}

/// Converts a message into the relay's item shape.
pub fn message_item(msg: &Message) -> MessageItem {
    MessageItem {
        id: i64::from(msg.id.0),
        chat_id: msg.chat.id.0,
        media: extract_media(msg),
        caption: msg
            .caption()
            .or_else(|| msg.text())
            .unwrap_or_default()
            .to_string(),
    }
}

/// A channel post ready for the archive. `None` for messages outside channels.
pub fn channel_post(msg: &Message) -> Option<ChannelPost> {
    if !msg.chat.is_channel() {
        return None;
    }
    Some(ChannelPost {
        channel: channel_handle(&msg.chat),
        item: message_item(msg),
    })
}

/// Archives a channel post. Failures are logged, never propagated to the dispatcher.
pub async fn archive_post(archive: &dyn PostArchive, msg: &Message) {
    let Some(post) = channel_post(msg) else {
        return;
    };
    match archive.append(&post).await {
        Ok(()) => debug!(
            channel = %post.channel,
            item_id = post.item.id,
            video = post.item.has_video_media(),
            "channel post archived"
        ),
        Err(e) => warn!(channel = %post.channel, item_id = post.item.id, error = %e, "failed to archive channel post"),
    }
}

/// Result of offering an operator's upload to the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOutcome {
    Saved { caption: String },
    Duplicate,
    NotAVideo,
}

impl LibraryOutcome {
    /// Reply text for the uploader.
    pub fn reply(&self) -> String {
        match self {
            Self::Saved { caption } => format!("Video saved with caption: {caption}"),
            Self::Duplicate => "This video already exists in the library.".to_string(),
            Self::NotAVideo => "Only videos can be added to the library.".to_string(),
        }
    }
}

/// Library entry for an uploaded item, if it is a video.
pub fn library_record(item: &MessageItem) -> Option<MediaRecord> {
    if !item.has_video_media() {
        return None;
    }
    MediaRecord::from_item(item)
}

/// Records an operator's upload in the media library.
pub async fn add_to_library(
    store: &dyn MediaStore,
    item: &MessageItem,
) -> Result<LibraryOutcome, RelayError> {
    let Some(record) = library_record(item) else {
        return Ok(LibraryOutcome::NotAVideo);
    };
    if store.record(&record).await? {
        debug!(media_ref = %record.media_ref.0, "video added to library");
        Ok(LibraryOutcome::Saved {
            caption: record.caption,
        })
    } else {
        Ok(LibraryOutcome::Duplicate)
    }
}
