// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vidrelay - relays videos from one Telegram channel to another.
//!
//! This is the binary entry point.

mod cursor;
mod health;
mod oneshot;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vidrelay_config::VidrelayConfig;
use vidrelay_core::RelayJob;
use vidrelay_relay::MAX_BATCH_SIZE;

/// Vidrelay - relays videos from one Telegram channel to another.
#[derive(Parser, Debug)]
#[command(name = "vidrelay", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the XDG configuration hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the operator bot, the relay registry, and the health endpoint.
    Serve,
    /// Run one relay job in the foreground, logging progress.
    Relay {
        /// Source channel name or @username.
        source: String,
        /// Destination channel name, @username, or numeric chat id.
        #[arg(allow_hyphen_values = true)]
        dest: String,
        /// Start at this message id instead of the stored cursor (0 = newest).
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        start: Option<i64>,
        /// Messages per page.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_BATCH_SIZE as u64))]
        batch: Option<u64>,
    },
    /// Inspect or override persisted cursors.
    Cursor {
        #[command(subcommand)]
        action: CursorCommand,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum CursorCommand {
    /// Print the cursor of one channel pair, or of every pair.
    Show {
        #[arg(requires = "dest", allow_hyphen_values = true)]
        source: Option<String>,
        #[arg(allow_hyphen_values = true)]
        dest: Option<String>,
    },
    /// Overwrite where the next relay of a channel pair resumes.
    Set {
        #[arg(allow_hyphen_values = true)]
        source: String,
        #[arg(allow_hyphen_values = true)]
        dest: String,
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        offset: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => vidrelay_config::load_and_validate_path(path),
        None => vidrelay_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            vidrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.daemon.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => {
            require_credentials(&config);
            serve::run_serve(config).await
        }
        Some(Commands::Relay {
            source,
            dest,
            start,
            batch,
        }) => {
            require_credentials(&config);
            let job = RelayJob {
                source_channel: source,
                dest_channel: dest,
                batch_size: batch.map_or(0, |b| b as usize),
                explicit_start: start,
            };
            oneshot::run_relay(config, job).await
        }
        Some(Commands::Cursor { action }) => cursor::run_cursor(config, action).await,
        None => {
            println!("vidrelay: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn require_credentials(config: &VidrelayConfig) {
    if let Err(e) = vidrelay_config::require_credentials(config) {
        vidrelay_config::render_errors(&[e]);
        std::process::exit(1);
    }
}
