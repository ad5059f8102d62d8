// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator command surface.
//!
//! Commands are parsed by teloxide and executed against the job registry.
//! Execution returns the reply text, so it can be exercised without a bot.

use std::sync::Arc;

use teloxide::types::Message;
use teloxide::utils::command::BotCommands;
use vidrelay_core::{ProgressSink, RelayError, RelayJob};
use vidrelay_relay::MAX_BATCH_SIZE;

use crate::bot::BotState;

/// Commands understood by the operator bot.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Relay commands:")]
pub enum Command {
    #[command(description = "show this help.")]
    Help,
    #[command(description = "relay videos: <source> <dest> [start_from] [batch_size].")]
    Relay(String),
    #[command(description = "cancel relays reading from <source>.")]
    Cancel(String),
    #[command(description = "list running relays.")]
    Jobs,
    #[command(description = "count videos in the library.")]
    TotalVideos,
}

const RELAY_USAGE: &str = "Usage: /relay <source> <dest> [start_from] [batch_size]";

/// Parses `/relay` arguments. A missing batch size is left as 0, meaning the configured default.
pub fn parse_relay_args(args: &str) -> Result<RelayJob, String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [source, dest, rest @ ..] = parts.as_slice() else {
        return Err(RELAY_USAGE.to_string());
    };
    if rest.len() > 2 {
        return Err(RELAY_USAGE.to_string());
    }

    let explicit_start = match rest.first() {
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 0 => Some(n),
            _ => return Err(format!("start_from must be a non-negative integer, got `{raw}`")),
        },
        None => None,
    };
    let batch_size = match rest.get(1) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_BATCH_SIZE).contains(&n) => n,
            _ => {
                return Err(format!(
                    "batch_size must be between 1 and {MAX_BATCH_SIZE}, got `{raw}`"
                ));
            }
        },
        None => 0,
    };

    Ok(RelayJob {
        source_channel: (*source).to_string(),
        dest_channel: (*dest).to_string(),
        batch_size,
        explicit_start,
    })
}

/// `true` if the sender's user id is in `operators`. An empty list admits nobody.
pub fn is_operator(msg: &Message, operators: &[i64]) -> bool {
    msg.from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .is_some_and(|id| operators.contains(&id))
}

pub const ACCESS_DENIED: &str = "Access denied.";

/// Runs `cmd` and returns the reply. `sink` receives the progress of a started relay.
pub async fn execute(state: &BotState, cmd: Command, sink: Arc<dyn ProgressSink>) -> String {
    match cmd {
        Command::Help => Command::descriptions().to_string(),
        Command::Relay(args) => {
            let job = match parse_relay_args(&args) {
                Ok(job) => job,
                Err(usage) => return usage,
            };
            let (source, dest) = (job.source_channel.clone(), job.dest_channel.clone());
            match state.registry.start(job, sink).await {
                Ok(handle) => format!(
                    "Relay started from `{source}` to `{dest}` (job {}).",
                    handle.job_id
                ),
                Err(RelayError::JobConflict { channel }) => {
                    format!("A relay for `{channel}` is already running.")
                }
                Err(RelayError::Cancelled) => "Shutting down; no new relays accepted.".to_string(),
                Err(e) => format!("Could not start relay: {e}"),
            }
        }
        Command::Cancel(source) => {
            let source = source.trim();
            if source.is_empty() {
                return "Usage: /cancel <source>".to_string();
            }
            if state.registry.cancel(source).await {
                format!("Cancelling relays from `{source}`.")
            } else {
                format!("No relay from `{source}` is running.")
            }
        }
        Command::Jobs => {
            let jobs = state.registry.running().await;
            if jobs.is_empty() {
                return "No relays running.".to_string();
            }
            let lines: Vec<String> = jobs
                .iter()
                .map(|j| {
                    format!(
                        "{} -> {} (since {}, job {})",
                        j.source,
                        j.dest,
                        j.started_at.format("%Y-%m-%d %H:%M UTC"),
                        j.job_id
                    )
                })
                .collect();
            lines.join("\n")
        }
        Command::TotalVideos => match state.media.count().await {
            Ok(n) => format!("Total videos in the library: {n}"),
            Err(e) => format!("Could not count videos: {e}"),
        },
    }
}
