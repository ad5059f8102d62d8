// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay transport over the Telegram Bot API.
//!
//! Each credential is a bot token. Every bot in the pool must be an admin of
//! both channels. History comes from the post archive, since bots cannot read
//! channel history; forwarding uses `copyMessage`, which keeps the caption.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::debug;
use vidrelay_core::{
    ChannelHandle, Credential, MessageItem, PostArchive, SessionState, TransportConnector,
    TransportError, TransportSession,
};

use crate::error::{archive_error, classify_request_error};

/// Opens [`BotApiSession`]s, one bot per credential.
pub struct BotApiConnector {
    archive: Arc<dyn PostArchive>,
}

impl BotApiConnector {
    pub fn new(archive: Arc<dyn PostArchive>) -> Self {
        Self { archive }
    }
}

#[async_trait]
impl TransportConnector for BotApiConnector {
    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        let bot = Bot::new(credential.session_token.expose_secret());
        let me = bot.get_me().await.map_err(classify_request_error)?;
        debug!(credential = %credential.id, bot = %me.username(), "bot session opened");
        Ok(Box::new(BotApiSession {
            credential_id: credential.id.clone(),
            bot,
            archive: Arc::clone(&self.archive),
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A live bot identity used by one relay job.
pub struct BotApiSession {
    credential_id: String,
    bot: Bot,
    archive: Arc<dyn PostArchive>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl BotApiSession {
    fn check_open(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Disconnected("bot session is not connected".into()))
        }
    }

    /// Marks the session dropped when the failure was a lost connection.
    fn observe(&self, err: TransportError) -> TransportError {
        if err.is_disconnect() {
            self.connected.store(false, Ordering::SeqCst);
        }
        err
    }
}

/// Fallback for channels the archive has not seen: a numeric chat id.
fn handle_from_id(name: &str) -> Option<ChannelHandle> {
    let id = name.trim().parse::<i64>().ok()?;
    Some(ChannelHandle {
        id,
        title: id.to_string(),
        username: None,
    })
}

#[async_trait]
impl TransportSession for BotApiSession {
    fn credential_id(&self) -> &str {
        &self.credential_id
    }

    fn state(&self) -> SessionState {
        if self.connected.load(Ordering::SeqCst) {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::rejected("bot session closed"));
        }
        self.bot.get_me().await.map_err(classify_request_error)?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_channel(&self, name: &str) -> Result<Option<ChannelHandle>, TransportError> {
        self.check_open()?;
        let known = self
            .archive
            .find_channel(name)
            .await
            .map_err(archive_error)?;
        Ok(known.or_else(|| handle_from_id(name)))
    }

    async fn fetch_history(
        &self,
        channel: &ChannelHandle,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageItem>, TransportError> {
        self.check_open()?;
        self.archive
            .page(channel.id, offset_id, limit)
            .await
            .map_err(archive_error)
    }

    async fn send_media(
        &self,
        dest: &ChannelHandle,
        item: &MessageItem,
    ) -> Result<(), TransportError> {
        self.check_open()?;
        let message_id = i32::try_from(item.id)
            .map(MessageId)
            .map_err(|_| TransportError::rejected(format!("message id {} out of range", item.id)))?;
        self.bot
            .copy_message(ChatId(dest.id), ChatId(item.chat_id), message_id)
            .await
            .map_err(|e| self.observe(classify_request_error(e)))?;
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(credential = %self.credential_id, "bot session closed");
        }
    }
}
