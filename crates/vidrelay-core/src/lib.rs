// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the vidrelay channel relay.
//!
//! This crate provides the error taxonomy, the shared domain types, and the
//! adapter traits implemented by stores, transports, and progress sinks.

pub mod caption;
pub mod error;
pub mod traits;
pub mod types;

pub use caption::clean_caption;
pub use error::{RelayError, TransportError};
pub use types::{
    ChannelHandle, ChannelPost, Credential, Cursor, HealthStatus, JobId, JobOutcome, JobReport,
    Media, MediaKind, MediaRecord, MediaRef, MessageItem, RelayJob,
};

pub use traits::{
    CursorStore, MediaStore, PluginAdapter, PostArchive, ProgressSink, SessionState,
    TransportConnector, TransportSession,
};
