// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing progress notices.

use async_trait::async_trait;

use crate::error::RelayError;

/// Best-effort receiver of milestone notices.
///
/// Errors are reported to the caller but never change the job's outcome.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), RelayError>;
}
