// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-channel resume positions.

use async_trait::async_trait;

use crate::error::RelayError;

/// Durable mapping from channel identifier to the last committed offset.
///
/// Both operations must be idempotent. Callers treat a `load` failure as
/// offset 0 and a `save` failure as a logged, non-fatal condition.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Returns the stored offset for `channel_id`, or 0 when none exists.
    async fn load(&self, channel_id: &str) -> Result<i64, RelayError>;

    /// Stores `offset_id` for `channel_id`, replacing any previous value.
    async fn save(&self, channel_id: &str, offset_id: i64) -> Result<(), RelayError>;
}
