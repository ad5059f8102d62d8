// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vidrelay relay` command: one job in the foreground.
//!
//! Progress goes to the log. History comes from the post archive that a
//! running `vidrelay serve` fills, so the bots must have seen the source
//! channel's posts.

use std::sync::Arc;

use tracing::info;
use vidrelay_config::VidrelayConfig;
use vidrelay_core::{JobOutcome, JobReport, RelayError, RelayJob};
use vidrelay_relay::{LogSink, install_signal_handler, run_job};

use crate::serve::{open_storage, relay_context};

pub async fn run_relay(config: VidrelayConfig, job: RelayJob) -> Result<(), RelayError> {
    let storage = open_storage(&config).await?;
    let ctx = relay_context(&config, storage)?;
    info!(
        source = %job.source_channel,
        dest = %job.dest_channel,
        "running one-shot relay"
    );
    let report = run_job(&ctx, job, Arc::new(LogSink), install_signal_handler()).await;
    println!("{}", summary(&report));
    outcome_result(report.outcome)
}

fn summary(report: &JobReport) -> String {
    let mut line = format!(
        "{}: {} forwarded, {} skipped, {} duplicates, {} abandoned in {} batches",
        report.outcome,
        report.forwarded,
        report.skipped_ineligible,
        report.duplicates,
        report.abandoned,
        report.batches,
    );
    if let Some(offset) = report.last_offset {
        line.push_str(&format!("; cursor at {offset}"));
    }
    line
}

/// A cancelled or drained job exits cleanly; anything else is an error.
fn outcome_result(outcome: JobOutcome) -> Result<(), RelayError> {
    match outcome {
        JobOutcome::Exhausted | JobOutcome::Cancelled => Ok(()),
        JobOutcome::ResolutionFailed(channel) => Err(RelayError::Resolution { channel }),
        JobOutcome::Conflict(pair) => Err(RelayError::JobConflict { channel: pair }),
        JobOutcome::Failed(reason) => Err(RelayError::Internal(reason)),
    }
}
