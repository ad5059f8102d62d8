// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime knobs of the relay loop, derived from configuration.

use std::time::Duration;

use vidrelay_config::VidrelayConfig;

/// Pacing, recovery, and reporting settings shared by every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Pause after every successful forward.
    pub pacing: Duration,
    /// Reconnect attempts with the same credential before rotating.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    /// Record forwarded items in the media store and skip known fingerprints.
    pub record_forwarded: bool,
    /// Emit a forward notice when `item.id % progress_every == 0`. 0 disables.
    pub progress_every: i64,
    /// Page size for jobs that do not name one.
    pub default_batch_size: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&VidrelayConfig::default())
    }
}

impl From<&VidrelayConfig> for RelaySettings {
    fn from(config: &VidrelayConfig) -> Self {
        Self {
            pacing: Duration::from_millis(config.relay.pacing_ms),
            reconnect_attempts: config.relay.reconnect_attempts,
            reconnect_delay: Duration::from_millis(config.relay.reconnect_delay_ms),
            record_forwarded: config.relay.record_forwarded,
            progress_every: config.telegram.progress_every,
            default_batch_size: config.relay.batch_size,
        }
    }
}
