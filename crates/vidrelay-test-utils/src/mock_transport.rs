// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transport for deterministic relay tests.
//!
//! `MockConnector` owns a shared world: channels, their histories, scripted
//! faults, and logs of every connect, fetch, and send. Sessions it opens all
//! read from and write to that world.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use vidrelay_core::{
    ChannelHandle, Credential, MessageItem, SessionState, TransportConnector, TransportError,
    TransportSession,
};

/// A fault to inject into a transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    RateLimited(Duration),
    /// Drops the session's connection; `reconnect` restores it.
    Disconnected,
    Rejected(String),
}

impl Fault {
    fn into_error(self) -> TransportError {
        match self {
            Fault::RateLimited(retry_after) => TransportError::RateLimited { retry_after },
            Fault::Disconnected => TransportError::Disconnected("connection reset by peer".into()),
            Fault::Rejected(message) => TransportError::rejected(message),
        }
    }
}

/// One `send_media` call as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRecord {
    pub credential_id: String,
    pub dest_id: i64,
    pub item_id: i64,
    pub delivered: bool,
}

type ForwardHook = Arc<dyn Fn(&SendRecord) + Send + Sync>;

#[derive(Default)]
struct World {
    channels: Vec<ChannelHandle>,
    history: HashMap<i64, Vec<MessageItem>>,
    send_faults: HashMap<i64, VecDeque<Fault>>,
    fetch_faults: VecDeque<Fault>,
    banned: HashSet<String>,
    unreachable: HashSet<String>,
    reconnect_failures: HashMap<String, u32>,
    connects: Vec<String>,
    reconnects: Vec<String>,
    disconnects: Vec<String>,
    resolves: Vec<String>,
    fetches: Vec<(String, i64, i64, usize)>,
    sends: Vec<SendRecord>,
    on_forward: Option<ForwardHook>,
}

/// Connector producing [`MockSession`]s over a shared scripted world.
#[derive(Clone, Default)]
pub struct MockConnector {
    world: Arc<Mutex<World>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel with its history (any order).
    pub async fn add_channel(&self, handle: ChannelHandle, mut items: Vec<MessageItem>) {
        items.sort_by(|a, b| b.id.cmp(&a.id));
        let mut world = self.world.lock().await;
        world.history.insert(handle.id, items);
        world.channels.push(handle);
    }

    /// Appends messages to an existing channel, as if newly posted.
    pub async fn post(&self, channel_id: i64, items: Vec<MessageItem>) {
        let mut world = self.world.lock().await;
        let history = world.history.entry(channel_id).or_default();
        history.extend(items);
        history.sort_by(|a, b| b.id.cmp(&a.id));
    }

    /// Queues faults returned, in order, by successive sends of `item_id`.
    pub async fn fail_send(&self, item_id: i64, faults: impl IntoIterator<Item = Fault>) {
        self.world
            .lock()
            .await
            .send_faults
            .entry(item_id)
            .or_default()
            .extend(faults);
    }

    /// Queues faults returned, in order, by successive fetches.
    pub async fn fail_fetch(&self, faults: impl IntoIterator<Item = Fault>) {
        self.world.lock().await.fetch_faults.extend(faults);
    }

    /// Every send made with `credential_id` is rejected from now on.
    pub async fn ban(&self, credential_id: &str) {
        self.world.lock().await.banned.insert(credential_id.to_string());
    }

    /// `connect` with `credential_id` fails.
    pub async fn make_unreachable(&self, credential_id: &str) {
        self.world
            .lock()
            .await
            .unreachable
            .insert(credential_id.to_string());
    }

    /// The next `times` reconnects with `credential_id` fail.
    pub async fn fail_reconnect(&self, credential_id: &str, times: u32) {
        self.world
            .lock()
            .await
            .reconnect_failures
            .insert(credential_id.to_string(), times);
    }

    /// Runs `hook` after every delivered send.
    pub async fn on_forward(&self, hook: impl Fn(&SendRecord) + Send + Sync + 'static) {
        self.world.lock().await.on_forward = Some(Arc::new(hook));
    }

    /// Delivered sends, in order.
    pub async fn forwarded(&self) -> Vec<SendRecord> {
        self.world
            .lock()
            .await
            .sends
            .iter()
            .filter(|s| s.delivered)
            .cloned()
            .collect()
    }

    /// Ids of delivered items, in order.
    pub async fn forwarded_ids(&self) -> Vec<i64> {
        self.forwarded().await.iter().map(|s| s.item_id).collect()
    }

    /// Every send attempt, delivered or not.
    pub async fn send_attempts(&self) -> Vec<SendRecord> {
        self.world.lock().await.sends.clone()
    }

    /// Send attempts for a single item.
    pub async fn attempts_for(&self, item_id: i64) -> usize {
        self.world
            .lock()
            .await
            .sends
            .iter()
            .filter(|s| s.item_id == item_id)
            .count()
    }

    /// Credential ids passed to `connect`, in order.
    pub async fn connects(&self) -> Vec<String> {
        self.world.lock().await.connects.clone()
    }

    pub async fn reconnects(&self) -> Vec<String> {
        self.world.lock().await.reconnects.clone()
    }

    pub async fn disconnects(&self) -> Vec<String> {
        self.world.lock().await.disconnects.clone()
    }

    /// Names passed to `resolve_channel`, in order.
    pub async fn resolves(&self) -> Vec<String> {
        self.world.lock().await.resolves.clone()
    }

    /// `(credential_id, channel_id, offset_id, limit)` of every fetch.
    pub async fn fetches(&self) -> Vec<(String, i64, i64, usize)> {
        self.world.lock().await.fetches.clone()
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        let mut world = self.world.lock().await;
        world.connects.push(credential.id.clone());
        if world.unreachable.contains(&credential.id) {
            return Err(TransportError::Disconnected(format!(
                "{} unreachable",
                credential.id
            )));
        }
        Ok(Box::new(MockSession {
            credential_id: credential.id.clone(),
            world: Arc::clone(&self.world),
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A session over the shared mock world.
pub struct MockSession {
    credential_id: String,
    world: Arc<Mutex<World>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl MockSession {
    fn check_open(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Disconnected("session is not connected".into()))
        }
    }

    fn apply(&self, fault: Fault) -> TransportError {
        if fault == Fault::Disconnected {
            self.connected.store(false, Ordering::SeqCst);
        }
        fault.into_error()
    }
}

#[async_trait]
impl TransportSession for MockSession {
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
            return Err(TransportError::rejected("session closed"));
        }
        let mut world = self.world.lock().await;
        world.reconnects.push(self.credential_id.clone());
        if let Some(remaining) = world.reconnect_failures.get_mut(&self.credential_id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(TransportError::Disconnected("reconnect refused".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_channel(&self, name: &str) -> Result<Option<ChannelHandle>, TransportError> {
        self.check_open()?;
        let mut world = self.world.lock().await;
        world.resolves.push(name.to_string());
        Ok(world.channels.iter().find(|c| c.matches(name)).cloned())
    }

    async fn fetch_history(
        &self,
        channel: &ChannelHandle,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageItem>, TransportError> {
        self.check_open()?;
        let mut world = self.world.lock().await;
        world
            .fetches
            .push((self.credential_id.clone(), channel.id, offset_id, limit));
        if let Some(fault) = world.fetch_faults.pop_front() {
            return Err(self.apply(fault));
        }
        let page = world
            .history
            .get(&channel.id)
            .map(|items| {
                items
                    .iter()
                    .filter(|i| offset_id == 0 || i.id <= offset_id)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page)
    }

    async fn send_media(
        &self,
        dest: &ChannelHandle,
        item: &MessageItem,
    ) -> Result<(), TransportError> {
        self.check_open()?;
        let mut world = self.world.lock().await;
        let mut record = SendRecord {
            credential_id: self.credential_id.clone(),
            dest_id: dest.id,
            item_id: item.id,
            delivered: false,
        };

        let fault = if world.banned.contains(&self.credential_id) {
            Some(Fault::Rejected(format!("{} is banned", self.credential_id)))
        } else {
            world
                .send_faults
                .get_mut(&item.id)
                .and_then(VecDeque::pop_front)
        };
        if let Some(fault) = fault {
            world.sends.push(record);
            return Err(self.apply(fault));
        }

        record.delivered = true;
        world.sends.push(record.clone());
        if let Some(hook) = world.on_forward.clone() {
            hook(&record);
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.world
                .lock()
                .await
                .disconnects
                .push(self.credential_id.clone());
        }
    }
}
