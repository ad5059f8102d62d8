// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress notices delivered to the operator's chat.

use async_trait::async_trait;
use teloxide::prelude::*;
use vidrelay_core::{ProgressSink, RelayError};

use crate::error::classify_request_error;

/// Sends each notice as a plain-text message to one chat.
#[derive(Clone)]
pub struct TelegramProgressSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramProgressSink {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

#[async_trait]
impl ProgressSink for TelegramProgressSink {
    async fn notify(&self, text: &str) -> Result<(), RelayError> {
        self.bot
            .send_message(self.chat_id, text)
            .await
            .map_err(|e| RelayError::Transport(classify_request_error(e)))?;
        Ok(())
    }
}
