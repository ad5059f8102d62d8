// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram integration for vidrelay.
//!
//! Provides the Bot API relay transport ([`BotApiConnector`]), the operator
//! bot with its command surface, update ingest into the post archive and the
//! media library, and a progress sink that reports into the operator's chat.

pub mod bot;
pub mod commands;
pub mod error;
pub mod ingest;
pub mod sink;
pub mod transport;

pub use bot::{BotState, OperatorBot};
pub use commands::{Command, execute, is_operator, parse_relay_args};
pub use error::classify_request_error;
pub use ingest::{LibraryOutcome, add_to_library, channel_post, message_item};
pub use sink::TelegramProgressSink;
pub use transport::{BotApiConnector, BotApiSession};
