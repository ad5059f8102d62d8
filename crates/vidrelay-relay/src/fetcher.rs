// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded page retrieval from the source channel.

use vidrelay_core::{ChannelHandle, MessageItem, TransportError, TransportSession};

pub use vidrelay_config::validation::MAX_BATCH_SIZE;

/// A page of messages, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub items: Vec<MessageItem>,
}

impl Batch {
    /// `true` when the source is exhausted up to its current head.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Offset to commit once every item has been attempted: one below the oldest id.
    pub fn next_offset(&self) -> Option<i64> {
        next_offset(&self.items)
    }
}

/// `min(id) - 1` over `items`, floored at 0.
pub fn next_offset(items: &[MessageItem]) -> Option<i64> {
    items.iter().map(|i| i.id).min().map(|id| (id - 1).max(0))
}

/// Fetches pages of `batch_size` through whatever session is active.
#[derive(Debug, Clone, Copy)]
pub struct BatchFetcher {
    batch_size: usize,
}

impl BatchFetcher {
    /// Page size is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetches the page at `offset_id`.
    ///
    /// The result is normalised: sorted newest first, trimmed to the page size,
    /// and, for a non-zero offset, stripped of anything above the offset so the
    /// committed cursor can only move toward older messages.
    pub async fn fetch(
        &self,
        session: &dyn TransportSession,
        channel: &ChannelHandle,
        offset_id: i64,
    ) -> Result<Batch, TransportError> {
        let mut items = session
            .fetch_history(channel, offset_id, self.batch_size)
            .await?;
        if offset_id > 0 {
            items.retain(|i| i.id <= offset_id);
        }
        items.sort_by(|a, b| b.id.cmp(&a.id));
        items.dedup_by_key(|i| i.id);
        items.truncate(self.batch_size);
        Ok(Batch { items })
    }
}
