// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure classification and cancellable waits.
//!
//! Rate limits are the only errors answered by waiting: the same request is
//! retried with the same session after exactly the provider's delay, with no
//! cap on consecutive waits. Everything else is a session problem.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vidrelay_core::TransportError;

/// What the relay does about a failed transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Wait, then retry the same call on the same session.
    Backoff(Duration),
    /// Reconnect with the same credential, then retry.
    Reconnect,
    /// Switch to the next credential.
    Rotate,
}

/// Maps a classified transport error to its recovery action.
pub fn classify(err: &TransportError) -> Recovery {
    if let Some(wait) = err.retry_after() {
        Recovery::Backoff(wait)
    } else if err.is_disconnect() {
        Recovery::Reconnect
    } else {
        Recovery::Rotate
    }
}

/// Sleeps for `duration` unless `cancel` fires first.
///
/// Returns `false` if the wait was cut short by cancellation.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Turns rate-limit signals into scheduled pauses and counts them.
#[derive(Debug)]
pub struct BackoffController {
    cancel: CancellationToken,
    waits: u64,
    waited: Duration,
}

impl BackoffController {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            waits: 0,
            waited: Duration::ZERO,
        }
    }

    /// Suspends for exactly `retry_after`. Returns `false` if cancelled meanwhile.
    pub async fn wait(&mut self, retry_after: Duration) -> bool {
        self.waits += 1;
        self.waited += retry_after;
        pause(retry_after, &self.cancel).await
    }

    /// Number of rate-limit waits so far.
    pub fn waits(&self) -> u64 {
        self.waits
    }

    /// Total time spent waiting on rate limits.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}
