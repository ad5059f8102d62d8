// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay core for vidrelay.
//!
//! Pages a source channel newest-first, forwards its videos to a destination
//! channel, and commits a resumable cursor after every page. Rate limits are
//! waited out, rejected sessions are rotated through the credential pool, and
//! jobs for different channel pairs run side by side without sharing a session.

pub mod backoff;
pub mod fetcher;
pub mod job;
pub mod pool;
pub mod processor;
pub mod progress;
pub mod settings;
pub mod shutdown;

pub use backoff::{BackoffController, Recovery, classify};
pub use fetcher::{Batch, BatchFetcher, MAX_BATCH_SIZE, next_offset};
pub use job::{
    CursorKeys, JobHandle, JobRegistry, JobSummary, JobTable, RelayContext, cursor_key, name_key,
    run_job,
};
pub use pool::{CredentialPool, ReconnectPolicy, SessionRotator};
pub use processor::{RelayProcessor, RelayState};
pub use progress::{LogSink, ProgressEvent, Reporter};
pub use settings::RelaySettings;
pub use shutdown::install_signal_handler;
