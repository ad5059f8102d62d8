// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Library of accepted videos, keyed by content fingerprint.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::MediaRecord;

/// External record of accepted media, used for duplicate detection.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Returns `true` if a record with the same fingerprint already exists.
    async fn contains(&self, fingerprint: &str) -> Result<bool, RelayError>;

    /// Records `record`. Returns `false` if its fingerprint was already present.
    async fn record(&self, record: &MediaRecord) -> Result<bool, RelayError>;

    /// Number of records in the library.
    async fn count(&self) -> Result<u64, RelayError>;
}
