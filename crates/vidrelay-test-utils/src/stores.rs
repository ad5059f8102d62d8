// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stores and a recording progress sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use vidrelay_core::{
    ChannelHandle, ChannelPost, CursorStore, MediaRecord, MediaStore, MessageItem, PostArchive,
    ProgressSink, RelayError,
};

fn injected(what: &str) -> RelayError {
    RelayError::Storage {
        source: format!("injected {what} failure").into(),
    }
}

/// Cursor store backed by a `HashMap`, with a log of every save.
#[derive(Clone, Default)]
pub struct MemoryCursorStore {
    offsets: Arc<Mutex<HashMap<String, i64>>>,
    saves: Arc<Mutex<Vec<(String, i64)>>>,
    fail_load: Arc<AtomicBool>,
    fail_save: Arc<AtomicBool>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a stored offset without recording a save.
    pub async fn seed(&self, channel_id: &str, offset_id: i64) {
        self.offsets
            .lock()
            .await
            .insert(channel_id.to_string(), offset_id);
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Every save call, in order (including failed ones).
    pub async fn saves(&self) -> Vec<(String, i64)> {
        self.saves.lock().await.clone()
    }

    /// Saved offsets for one channel, in order.
    pub async fn saves_for(&self, channel_id: &str) -> Vec<i64> {
        self.saves
            .lock()
            .await
            .iter()
            .filter(|(c, _)| c == channel_id)
            .map(|(_, o)| *o)
            .collect()
    }

    /// Current value without going through the failure switches.
    pub async fn peek(&self, channel_id: &str) -> Option<i64> {
        self.offsets.lock().await.get(channel_id).copied()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self, channel_id: &str) -> Result<i64, RelayError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(injected("load"));
        }
        Ok(self.peek(channel_id).await.unwrap_or(0))
    }

    async fn save(&self, channel_id: &str, offset_id: i64) -> Result<(), RelayError> {
        self.saves
            .lock()
            .await
            .push((channel_id.to_string(), offset_id));
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(injected("save"));
        }
        self.offsets
            .lock()
            .await
            .insert(channel_id.to_string(), offset_id);
        Ok(())
    }
}

/// Media library keyed by fingerprint.
#[derive(Clone, Default)]
pub struct MemoryMediaStore {
    records: Arc<Mutex<HashMap<String, MediaRecord>>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<MediaRecord> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn contains(&self, fingerprint: &str) -> Result<bool, RelayError> {
        Ok(self.records.lock().await.contains_key(fingerprint))
    }

    async fn record(&self, record: &MediaRecord) -> Result<bool, RelayError> {
        let mut records = self.records.lock().await;
        let fingerprint = record.fingerprint();
        if records.contains_key(&fingerprint) {
            return Ok(false);
        }
        records.insert(fingerprint, record.clone());
        Ok(true)
    }

    async fn count(&self) -> Result<u64, RelayError> {
        Ok(self.records.lock().await.len() as u64)
    }
}

/// Post archive over a `Vec`, with the same paging rules as the SQLite one.
#[derive(Clone, Default)]
pub struct MemoryPostArchive {
    channels: Arc<Mutex<HashMap<i64, ChannelHandle>>>,
    posts: Arc<Mutex<HashMap<(i64, i64), MessageItem>>>,
}

impl MemoryPostArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostArchive for MemoryPostArchive {
    async fn append(&self, post: &ChannelPost) -> Result<(), RelayError> {
        self.channels
            .lock()
            .await
            .insert(post.channel.id, post.channel.clone());
        self.posts
            .lock()
            .await
            .insert((post.channel.id, post.item.id), post.item.clone());
        Ok(())
    }

    async fn remember_channel(&self, channel: &ChannelHandle) -> Result<(), RelayError> {
        self.channels
            .lock()
            .await
            .insert(channel.id, channel.clone());
        Ok(())
    }

    async fn find_channel(&self, name: &str) -> Result<Option<ChannelHandle>, RelayError> {
        Ok(self
            .channels
            .lock()
            .await
            .values()
            .find(|c| c.matches(name))
            .cloned())
    }

    async fn page(
        &self,
        channel_id: i64,
        offset_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageItem>, RelayError> {
        let posts = self.posts.lock().await;
        let mut items: Vec<_> = posts
            .iter()
            .filter(|((c, id), _)| *c == channel_id && (offset_id <= 0 || *id <= offset_id))
            .map(|(_, item)| item.clone())
            .collect();
        items.sort_by(|a, b| b.id.cmp(&a.id));
        items.truncate(limit);
        Ok(items)
    }
}

/// Progress sink that records every notice.
#[derive(Clone, Default)]
pub struct RecordingSink {
    notices: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `notify` fails (after recording the text).
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub async fn notices(&self) -> Vec<String> {
        self.notices.lock().await.clone()
    }

    /// Returns `true` if any notice contains `needle`.
    pub async fn saw(&self, needle: &str) -> bool {
        self.notices.lock().await.iter().any(|n| n.contains(needle))
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn notify(&self, text: &str) -> Result<(), RelayError> {
        self.notices.lock().await.push(text.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::Internal("sink unavailable".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel, video_item};

    #[tokio::test]
    async fn cursor_store_defaults_to_zero_and_logs_saves() {
        let store = MemoryCursorStore::new();
        assert_eq!(store.load("x").await.unwrap(), 0);
        store.save("x", 5).await.unwrap();
        assert_eq!(store.load("x").await.unwrap(), 5);
        assert_eq!(store.saves_for("x").await, vec![5]);
    }

    #[tokio::test]
    async fn failing_save_keeps_previous_value() {
        let store = MemoryCursorStore::new();
        store.seed("x", 9).await;
        store.set_fail_save(true);
        assert!(store.save("x", 3).await.is_err());
        assert_eq!(store.peek("x").await, Some(9));
    }

    #[tokio::test]
    async fn archive_pages_like_history() {
        let archive = MemoryPostArchive::new();
        let src = channel(-5, "Films");
        for id in 1..=4 {
            archive
                .append(&ChannelPost {
                    channel: src.clone(),
                    item: video_item(-5, id),
                })
                .await
                .unwrap();
        }
        let ids: Vec<_> = archive
            .page(-5, 3, 2)
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(archive.find_channel("films").await.unwrap(), Some(src));
    }

    #[tokio::test]
    async fn failing_sink_still_records() {
        let sink = RecordingSink::failing();
        assert!(sink.notify("hello").await.is_err());
        assert!(sink.saw("hello").await);
    }
}
