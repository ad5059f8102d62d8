// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for vidrelay integration tests.
//!
//! Deterministic stand-ins for every collaborator of the relay core, with
//! call capture for assertions.
//!
//! - [`MockConnector`] / [`MockSession`] - scripted transport with fault injection
//! - [`MemoryCursorStore`] - in-memory cursor store with optional failures
//! - [`MemoryMediaStore`] - in-memory media library
//! - [`MemoryPostArchive`] - in-memory channel post archive
//! - [`RecordingSink`] - progress sink capturing notices

pub mod mock_transport;
pub mod stores;

pub use mock_transport::{Fault, MockConnector, MockSession, SendRecord};
pub use stores::{MemoryCursorStore, MemoryMediaStore, MemoryPostArchive, RecordingSink};

use vidrelay_core::{ChannelHandle, Media, MediaKind, MediaRef, MessageItem};

/// A channel handle for tests.
pub fn channel(id: i64, title: &str) -> ChannelHandle {
    ChannelHandle {
        id,
        title: title.to_string(),
        username: Some(title.to_lowercase().replace(' ', "_")),
    }
}

/// A video message with a deterministic media ref and size.
pub fn video_item(chat_id: i64, id: i64) -> MessageItem {
    MessageItem {
        id,
        chat_id,
        media: Some(Media {
            kind: MediaKind::Video,
            media_ref: MediaRef(format!("video-{id}")),
            size_bytes: Some(1_000 + id as u64),
        }),
        caption: format!("video {id}"),
    }
}

/// A text-only message.
pub fn text_item(chat_id: i64, id: i64) -> MessageItem {
    MessageItem {
        id,
        chat_id,
        media: None,
        caption: format!("text {id}"),
    }
}
