// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operator bot: long polling, update routing, and shutdown.
//!
//! Routes three kinds of updates:
//! - channel posts and membership changes, into the post archive
//! - operator commands, into the job registry
//! - operator video uploads, into the media library

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidrelay_config::model::TelegramConfig;
use vidrelay_core::{HealthStatus, MediaStore, PluginAdapter, PostArchive, RelayError};
use vidrelay_relay::JobRegistry;

use crate::commands::{ACCESS_DENIED, Command, execute, is_operator};
use crate::ingest::{add_to_library, archive_post, channel_handle, message_item};
use crate::sink::TelegramProgressSink;

/// Shared dependencies of every update handler.
pub struct BotState {
    pub registry: Arc<JobRegistry>,
    pub media: Arc<dyn MediaStore>,
    pub archive: Arc<dyn PostArchive>,
    pub operators: Vec<i64>,
}

/// Telegram front end for operators.
pub struct OperatorBot {
    bot: Bot,
    state: Arc<BotState>,
}

impl OperatorBot {
    /// Requires `config.bot_token` to be set and non-empty.
    pub fn new(config: &TelegramConfig, state: Arc<BotState>) -> Result<Self, RelayError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            RelayError::Config("telegram.bot_token is required to run the operator bot".into())
        })?;
        if token.is_empty() {
            return Err(RelayError::Config("telegram.bot_token cannot be empty".into()));
        }
        if state.operators.is_empty() {
            warn!("telegram.operators is empty; every command will be refused");
        }
        Ok(Self {
            bot: Bot::new(token),
            state,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Polls for updates until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), schema())
            .dependencies(dptree::deps![Arc::clone(&self.state)])
            .default_handler(|_| async {})
            .build();

        let shutdown = dispatcher.shutdown_token();
        tokio::spawn(async move {
            cancel.cancelled().await;
            match shutdown.shutdown() {
                Ok(done) => {
                    done.await;
                    debug!("update polling stopped");
                }
                Err(e) => debug!(error = %e, "dispatcher was not running"),
            }
        });

        info!("starting Telegram long polling");
        dispatcher.dispatch().await;
    }
}

#[async_trait]
impl PluginAdapter for OperatorBot {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        debug!("operator bot shutting down");
        Ok(())
    }
}

/// Update routing tree.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_channel_post().endpoint(on_channel_post))
        .branch(Update::filter_edited_channel_post().endpoint(on_channel_post))
        .branch(Update::filter_my_chat_member().endpoint(on_membership))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::filter(|msg: Message, state: Arc<BotState>| {
                        !is_operator(&msg, &state.operators)
                    })
                    .endpoint(on_unauthorized),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(on_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.video().is_some()).endpoint(on_upload),
                ),
        )
}

async fn on_channel_post(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    archive_post(state.archive.as_ref(), &msg).await;
    Ok(())
}

async fn on_membership(update: ChatMemberUpdated, state: Arc<BotState>) -> ResponseResult<()> {
    if update.chat.is_channel() {
        let handle = channel_handle(&update.chat);
        match state.archive.remember_channel(&handle).await {
            Ok(()) => info!(channel = %handle, "channel membership recorded"),
            Err(e) => warn!(channel = %handle, error = %e, "failed to record channel"),
        }
    }
    Ok(())
}

async fn on_unauthorized(bot: Bot, msg: Message) -> ResponseResult<()> {
    debug!(chat_id = msg.chat.id.0, "refusing message from non-operator");
    if msg.chat.is_private() {
        bot.send_message(msg.chat.id, ACCESS_DENIED).await?;
    }
    Ok(())
}

async fn on_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    debug!(chat_id = msg.chat.id.0, command = ?cmd, "operator command");
    let sink = Arc::new(TelegramProgressSink::new(bot.clone(), msg.chat.id));
    let reply = execute(&state, cmd, sink).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn on_upload(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let item = message_item(&msg);
    let reply = match add_to_library(state.media.as_ref(), &item).await {
        Ok(outcome) => outcome.reply(),
        Err(e) => {
            warn!(error = %e, "failed to store uploaded video");
            format!("Could not save the video: {e}")
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
