// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential pool and per-job session rotation.
//!
//! The pool is shared by all jobs and only hands out starting indices; each
//! job owns a [`SessionRotator`] and therefore its own session. Jobs never
//! share a live session.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidrelay_core::{Credential, RelayError, TransportConnector, TransportError, TransportSession};

use crate::backoff::pause;

/// Ordered set of interchangeable credentials.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    next: AtomicUsize,
}

impl CredentialPool {
    /// Builds a pool. Fails with [`RelayError::NoCredentials`] when empty.
    pub fn new(credentials: Vec<Credential>) -> Result<Self, RelayError> {
        if credentials.is_empty() {
            return Err(RelayError::NoCredentials);
        }
        Ok(Self {
            credentials,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The credential at `index`, wrapping around the pool.
    pub fn get(&self, index: usize) -> &Credential {
        &self.credentials[index % self.credentials.len()]
    }

    /// Hands out starting indices round-robin, one per job.
    pub fn assign(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.credentials.len()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.credentials.iter().map(|c| c.id.as_str()).collect()
    }
}

/// Bounded same-credential reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

/// Owns one job's active session and swaps credentials on demand.
pub struct SessionRotator {
    pool: Arc<CredentialPool>,
    connector: Arc<dyn TransportConnector>,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
    index: usize,
    session: Option<Box<dyn TransportSession>>,
    rotations: u64,
}

impl SessionRotator {
    pub fn new(
        pool: Arc<CredentialPool>,
        connector: Arc<dyn TransportConnector>,
        policy: ReconnectPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pool,
            connector,
            policy,
            cancel,
            index: 0,
            session: None,
            rotations: 0,
        }
    }

    /// Opens a session with the credential at `index`, closing any current one.
    pub async fn activate(&mut self, index: usize) -> Result<(), TransportError> {
        self.close().await;
        self.index = index % self.pool.len();
        let credential = self.pool.get(self.index);
        let session = self.connector.connect(credential).await?;
        info!(credential = %credential.id, "session connected");
        self.session = Some(session);
        Ok(())
    }

    /// Retires the current session and activates the next credential.
    ///
    /// Walks the pool circularly until a credential connects or every one
    /// has been tried once.
    pub async fn rotate(&mut self) -> Result<(), TransportError> {
        let from = self.credential_id().to_string();
        self.rotations += 1;
        let mut last_err = None;
        for step in 1..=self.pool.len() {
            let index = (self.index + step) % self.pool.len();
            match self.activate(index).await {
                Ok(()) => {
                    info!(from = %from, to = %self.credential_id(), "credential rotated");
                    return Ok(());
                }
                Err(e) => {
                    warn!(credential = %self.pool.get(index).id, error = %e, "credential failed to connect");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| TransportError::rejected("credential pool exhausted")))
    }

    /// Reconnects the current session with the same credential if it dropped.
    ///
    /// Tries up to `policy.attempts` times, `policy.delay` apart.
    pub async fn ensure_connected(&mut self) -> Result<(), TransportError> {
        let Some(session) = self.session.as_ref() else {
            return self.activate(self.index).await;
        };
        if session.is_connected() {
            return Ok(());
        }

        let mut last_err = TransportError::Disconnected("session dropped".into());
        for attempt in 1..=self.policy.attempts.max(1) {
            if attempt > 1 && !pause(self.policy.delay, &self.cancel).await {
                return Err(TransportError::Disconnected("reconnect cancelled".into()));
            }
            match session.reconnect().await {
                Ok(()) => {
                    info!(credential = %session.credential_id(), attempt, "session reconnected");
                    return Ok(());
                }
                Err(e) => {
                    debug!(credential = %session.credential_id(), attempt, error = %e, "reconnect failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    /// The active session.
    pub fn session(&self) -> Result<&dyn TransportSession, TransportError> {
        self.session
            .as_deref()
            .ok_or_else(|| TransportError::Disconnected("no active session".into()))
    }

    /// Id of the credential currently (or last) in use.
    pub fn credential_id(&self) -> &str {
        &self.pool.get(self.index).id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of credentials this rotator can cycle through.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Number of `rotate` calls so far.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Disconnects the active session, if any.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.disconnect().await;
            debug!(credential = %session.credential_id(), "session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidrelay_test_utils::MockConnector;

    fn pool(ids: &[&str]) -> Arc<CredentialPool> {
        Arc::new(
            CredentialPool::new(ids.iter().map(|id| Credential::with_token(*id, "t")).collect())
                .unwrap(),
        )
    }

    fn rotator(pool: Arc<CredentialPool>, connector: &MockConnector) -> SessionRotator {
        SessionRotator::new(
            pool,
            Arc::new(connector.clone()),
            ReconnectPolicy {
                attempts: 3,
                delay: Duration::from_millis(100),
            },
            CancellationToken::new(),
        )
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(
            CredentialPool::new(Vec::new()),
            Err(RelayError::NoCredentials)
        ));
    }

    #[test]
    fn assign_is_round_robin() {
        let pool = pool(&["a", "b", "c"]);
        let starts: Vec<_> = (0..5).map(|_| pool.assign()).collect();
        assert_eq!(starts, vec![0, 1, 2, 0, 1]);
        assert_eq!(pool.get(4).id, "b");
    }

    #[tokio::test]
    async fn rotate_advances_circularly_and_disconnects_old_session() {
        let connector = MockConnector::new();
        let mut rotator = rotator(pool(&["a", "b"]), &connector);

        rotator.activate(1).await.unwrap();
        assert_eq!(rotator.credential_id(), "b");

        rotator.rotate().await.unwrap();
        assert_eq!(rotator.credential_id(), "a");
        assert_eq!(rotator.session().unwrap().credential_id(), "a");
        assert_eq!(connector.connects().await, vec!["b", "a"]);
        assert_eq!(connector.disconnects().await, vec!["b"]);
        assert_eq!(rotator.rotations(), 1);
    }

    #[tokio::test]
    async fn rotate_skips_unreachable_credentials() {
        let connector = MockConnector::new();
        connector.make_unreachable("b").await;
        let mut rotator = rotator(pool(&["a", "b", "c"]), &connector);
        rotator.activate(0).await.unwrap();

        rotator.rotate().await.unwrap();
        assert_eq!(rotator.credential_id(), "c");
    }

    #[tokio::test]
    async fn rotate_fails_when_nothing_connects() {
        let connector = MockConnector::new();
        let mut rotator = rotator(pool(&["a", "b"]), &connector);
        rotator.activate(0).await.unwrap();
        connector.make_unreachable("a").await;
        connector.make_unreachable("b").await;

        assert!(rotator.rotate().await.is_err());
        assert!(rotator.session().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_session_reconnects_with_same_credential() {
        let connector = MockConnector::new();
        connector
            .fail_send(1, [vidrelay_test_utils::Fault::Disconnected])
            .await;
        connector.fail_reconnect("a", 2).await;
        let mut rotator = rotator(pool(&["a", "b"]), &connector);
        rotator.activate(0).await.unwrap();

        let dest = vidrelay_test_utils::channel(-2, "Dest");
        let item = vidrelay_test_utils::video_item(-1, 1);
        assert!(rotator.session().unwrap().send_media(&dest, &item).await.is_err());

        rotator.ensure_connected().await.unwrap();
        assert_eq!(rotator.credential_id(), "a");
        assert_eq!(connector.reconnects().await.len(), 3);
        assert_eq!(connector.connects().await, vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_gives_up_after_policy_attempts() {
        let connector = MockConnector::new();
        connector
            .fail_send(1, [vidrelay_test_utils::Fault::Disconnected])
            .await;
        connector.fail_reconnect("a", 10).await;
        let mut rotator = rotator(pool(&["a"]), &connector);
        rotator.activate(0).await.unwrap();

        let dest = vidrelay_test_utils::channel(-2, "Dest");
        let item = vidrelay_test_utils::video_item(-1, 1);
        let _ = rotator.session().unwrap().send_media(&dest, &item).await;

        assert!(rotator.ensure_connected().await.unwrap_err().is_disconnect());
        assert_eq!(connector.reconnects().await.len(), 3);
    }
}
