// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive of channel posts observed through the update stream.
//!
//! Bot accounts cannot read channel history on demand, so posts are recorded
//! as they arrive and paged back out with the same semantics as a history call.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{ChannelHandle, ChannelPost, MessageItem};

#[async_trait]
pub trait PostArchive: Send + Sync {
    /// Records a post and refreshes the channel's title and username.
    async fn append(&self, post: &ChannelPost) -> Result<(), RelayError>;

    /// Records or refreshes a channel without a post, e.g. when the bot is added to it.
    async fn remember_channel(&self, channel: &ChannelHandle) -> Result<(), RelayError>;

    /// Finds an archived channel by username (with or without `@`) or exact title.
    async fn find_channel(&self, name: &str) -> Result<Option<ChannelHandle>, RelayError>;

    /// Returns up to `limit` posts of `channel_id`, newest first.
    ///
    /// `offset_id == 0` starts at the newest post; otherwise only posts with
    /// `id <= offset_id` are returned.
    async fn page(
        &self,
        channel_id: i64,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageItem>, RelayError>;
}
