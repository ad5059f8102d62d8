// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of Bot API failures.
//!
//! This is the only place that looks at teloxide's error shapes. Everything
//! downstream sees a [`TransportError`].

use teloxide::RequestError;
use vidrelay_core::{RelayError, TransportError};

/// Maps a Bot API failure onto the relay's transport error classes.
///
/// Flood control becomes a rate limit carrying the server's wait, network
/// and I/O failures become disconnects, and everything else is a rejection.
pub fn classify_request_error(err: RequestError) -> TransportError {
    match err {
        RequestError::RetryAfter(secs) => TransportError::RateLimited {
            retry_after: secs.duration(),
        },
        RequestError::Network(_) | RequestError::Io(_) => {
            TransportError::Disconnected(err.to_string())
        }
        other => TransportError::Rejected {
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

/// Archive failures surface as rejections so the relay rotates or gives up.
pub(crate) fn archive_error(err: RelayError) -> TransportError {
    TransportError::Rejected {
        message: format!("post archive unavailable: {err}"),
        source: Some(Box::new(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use teloxide::ApiError;
    use teloxide::types::{ChatId, Seconds};

    use super::*;

    #[test]
    fn flood_wait_is_a_rate_limit() {
        let err = classify_request_error(RequestError::RetryAfter(Seconds::from_seconds(42)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
    }

    #[test]
    fn api_errors_are_rejections() {
        let err = classify_request_error(RequestError::Api(ApiError::BotBlocked));
        assert!(matches!(err, TransportError::Rejected { source: Some(_), .. }));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn migration_is_a_rejection() {
        let err = classify_request_error(RequestError::MigrateToChatId(ChatId(-100)));
        assert!(matches!(err, TransportError::Rejected { .. }));
    }

    #[test]
    fn archive_errors_keep_their_cause() {
        let err = archive_error(RelayError::Internal("disk gone".into()));
        assert!(err.to_string().contains("disk gone"));
    }
}
