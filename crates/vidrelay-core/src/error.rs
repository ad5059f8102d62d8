// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the vidrelay relay core.
//!
//! Transport failures are classified once, at the adapter boundary, into
//! [`TransportError`]. The relay processor only ever looks at that
//! classification, never at provider error text.

use std::time::Duration;

use thiserror::Error;

/// A classified failure reported by a transport session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider asked the caller to pause before retrying the same request.
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The connection dropped underneath the session.
    #[error("connection lost: {0}")]
    Disconnected(String),

    /// The provider refused the request (permission revoked, account banned, bad peer, ...).
    #[error("request rejected: {message}")]
    Rejected {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    /// Shorthand for a rejection without an underlying cause.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the provider-dictated wait if this is a rate-limit signal.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Returns `true` for a dropped connection that may recover with the same credential.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

/// The primary error type used across vidrelay crates.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (database open, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A source or destination channel could not be identified.
    #[error("channel `{channel}` not found")]
    Resolution { channel: String },

    /// A classified transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The credential pool is empty.
    #[error("no credentials configured")]
    NoCredentials,

    /// A job for the same channel pair is already running.
    #[error("a relay job for `{channel}` is already running")]
    JobConflict { channel: String },

    /// The job was cancelled at a suspension point.
    #[error("relay job cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Wraps any error as a storage failure.
    pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(e),
        }
    }
}
