// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Milestone notices for the operator.
//!
//! Notices are best-effort: a failing sink is logged at `debug` and otherwise
//! ignored, and never changes a job's outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use vidrelay_core::{ChannelHandle, JobId, ProgressSink, RelayError};

/// A milestone worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Connected { credential: String },
    ChannelFound { role: &'static str, channel: ChannelHandle },
    ChannelMissing { channel: String },
    AlreadyRunning { pair: String },
    Resuming { offset: i64 },
    Fetching { offset: i64 },
    Forwarded { item_id: i64 },
    RateLimited { wait: Duration },
    Rotated { from: String, to: String },
    ItemAbandoned { item_id: i64 },
    BatchDone { next_offset: i64, forwarded: u64 },
    Exhausted,
    Cancelled { offset: i64 },
    CriticalError { error: String },
    Closed,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { credential } => write!(f, "Connected with credential `{credential}`."),
            Self::ChannelFound { role, channel } => write!(f, "Found {role} channel: {channel}"),
            Self::ChannelMissing { channel } => write!(f, "Channel `{channel}` not found."),
            Self::AlreadyRunning { pair } => write!(f, "A relay for {pair} is already running."),
            Self::Resuming { offset } => write!(f, "Starting from offset {offset}."),
            Self::Fetching { offset } => write!(f, "Fetching messages from offset {offset}..."),
            Self::Forwarded { item_id } => write!(f, "Forwarded message {item_id}."),
            Self::RateLimited { wait } => write!(
                f,
                "Rate limited. Waiting {} seconds before retrying.",
                wait.as_secs()
            ),
            Self::Rotated { from, to } => write!(f, "Switched credential from `{from}` to `{to}`."),
            Self::ItemAbandoned { item_id } => write!(f, "Skipped message {item_id} after a failed forward."),
            Self::BatchDone {
                next_offset,
                forwarded,
            } => write!(
                f,
                "Processed batch ({forwarded} forwarded). Next offset: {next_offset}"
            ),
            Self::Exhausted => write!(f, "No more messages to process."),
            Self::Cancelled { offset } => write!(f, "Relay cancelled. Cursor remains at {offset}."),
            Self::CriticalError { error } => write!(f, "Critical error: {error}"),
            Self::Closed => write!(f, "Session closed."),
        }
    }
}

/// Sends [`ProgressEvent`]s for one job to a sink, swallowing failures.
#[derive(Clone)]
pub struct Reporter {
    job_id: JobId,
    sink: Arc<dyn ProgressSink>,
}

impl Reporter {
    pub fn new(job_id: JobId, sink: Arc<dyn ProgressSink>) -> Self {
        Self { job_id, sink }
    }

    pub async fn emit(&self, event: ProgressEvent) {
        let text = event.to_string();
        if let Err(e) = self.sink.notify(&text).await {
            debug!(job_id = %self.job_id, error = %e, "progress notice dropped");
        }
    }
}

/// Sink that writes notices to the log; used by the one-shot CLI relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn notify(&self, text: &str) -> Result<(), RelayError> {
        info!(progress = true, "{text}");
        Ok(())
    }
}
