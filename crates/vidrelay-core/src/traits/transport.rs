// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport connector and session traits.
//!
//! A session wraps exactly one credential. It moves through
//! `Disconnected -> Connecting -> Connected` and may drop back to
//! `Disconnected` when the provider closes the connection; `reconnect`
//! retries with the same credential.

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{ChannelHandle, Credential, MessageItem};

/// Connection state of a [`TransportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

/// Opens sessions from credentials.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Opens a connected session for `credential`.
    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// A live connection built from one credential.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Id of the credential this session was opened with.
    fn credential_id(&self) -> &str;

    fn state(&self) -> SessionState;

    fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Re-establishes a dropped connection with the same credential.
    async fn reconnect(&self) -> Result<(), TransportError>;

    /// Maps a human-provided channel identifier or title to the provider handle.
    async fn resolve_channel(&self, name: &str) -> Result<Option<ChannelHandle>, TransportError>;

    /// Fetches up to `limit` messages, newest first.
    ///
    /// `offset_id == 0` starts at the channel head; otherwise only messages
    /// with `id <= offset_id` are returned. An empty page means the channel
    /// is exhausted.
    async fn fetch_history(
        &self,
        channel: &ChannelHandle,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageItem>, TransportError>;

    /// Sends the media of `item` to `dest`, preserving its caption.
    async fn send_media(&self, dest: &ChannelHandle, item: &MessageItem)
    -> Result<(), TransportError>;

    /// Closes the session. Terminal.
    async fn disconnect(&self);
}
