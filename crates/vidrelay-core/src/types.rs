// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the relay core, the stores, and the transports.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

/// Persisted resume position, keyed by channel pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub channel_id: String,
    pub offset_id: i64,
}

/// One interchangeable account credential.
///
/// Immutable configuration owned by the credential pool. Only the transport
/// reads the secret parts.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub id: String,
    #[serde(default)]
    pub application_id: Option<i64>,
    #[serde(default)]
    pub application_secret: Option<SecretString>,
    pub session_token: SecretString,
}

impl Credential {
    /// Builds a credential carrying only a session token.
    pub fn with_token(id: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            application_id: None,
            application_secret: None,
            session_token: SecretString::from(session_token.into()),
        }
    }
}

/// The provider's handle for a resolved channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelHandle {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
}

impl ChannelHandle {
    /// Returns `true` if `name` equals the channel's username (with or without `@`) or title.
    pub fn matches(&self, name: &str) -> bool {
        let bare = name.trim_start_matches('@');
        self.username.as_deref() == Some(bare) || self.title == name
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(u) => write!(f, "{} (@{u})", self.title),
            None => write!(f, "{} ({})", self.title, self.id),
        }
    }
}

/// Opaque provider reference to a media payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef(pub String);

/// Kind of media attached to a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Video,
    Photo,
    Document,
    Other,
}

/// A media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub media_ref: MediaRef,
    pub size_bytes: Option<u64>,
}

/// A message fetched from the source channel. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: i64,
    /// Provider id of the channel the message lives in.
    pub chat_id: i64,
    pub media: Option<Media>,
    pub caption: String,
}

impl MessageItem {
    /// The relay eligibility filter.
    pub fn has_video_media(&self) -> bool {
        matches!(&self.media, Some(m) if m.kind == MediaKind::Video)
    }
}

/// Parameters of one relay run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayJob {
    pub source_channel: String,
    pub dest_channel: String,
    pub batch_size: usize,
    /// Overrides the stored cursor for this run only.
    pub explicit_start: Option<i64>,
}

/// Description of an accepted video, as kept by the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub media_ref: MediaRef,
    pub caption: String,
    pub size_bytes: Option<u64>,
}

impl MediaRecord {
    /// Describes the media of `item`, if it has any.
    ///
    /// The caption is cleaned; when nothing is left the media ref stands in,
    /// so captionless videos of equal size stay distinct.
    pub fn from_item(item: &MessageItem) -> Option<Self> {
        item.media.as_ref().map(|m| {
            let cleaned = crate::caption::clean_caption(&item.caption);
            Self {
                media_ref: m.media_ref.clone(),
                caption: if cleaned.is_empty() {
                    m.media_ref.0.clone()
                } else {
                    cleaned
                },
                size_bytes: m.size_bytes,
            }
        })
    }

    /// Content fingerprint used for duplicate detection: caption plus size.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.caption.to_lowercase().as_bytes());
        hasher.update([0u8]);
        if let Some(size) = self.size_bytes {
            hasher.update(size.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// A channel post observed by an update listener and kept for later paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPost {
    pub channel: ChannelHandle,
    pub item: MessageItem,
}

/// Unique identifier for a running relay job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a relay job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The walk reached the oldest message, or what an earlier walk already relayed.
    Exhausted,
    /// The source or destination channel could not be resolved.
    ResolutionFailed(String),
    /// Another running job already relays the same resolved channel pair.
    Conflict(String),
    /// Cooperative cancellation took effect.
    Cancelled,
    /// An unrecoverable error ended the job.
    Failed(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Exhausted => write!(f, "exhausted"),
            JobOutcome::ResolutionFailed(c) => write!(f, "channel {c} not found"),
            JobOutcome::Conflict(pair) => write!(f, "{pair} is already being relayed"),
            JobOutcome::Cancelled => write!(f, "cancelled"),
            JobOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Counters and outcome of a finished relay job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    pub forwarded: u64,
    pub skipped_ineligible: u64,
    pub duplicates: u64,
    pub abandoned: u64,
    pub batches: u64,
    pub rate_limit_waits: u64,
    pub rotations: u64,
    /// Last offset committed to the cursor store during this job.
    pub last_offset: Option<i64>,
}

impl JobReport {
    /// An empty report for a job that has not processed anything yet.
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            outcome: JobOutcome::Exhausted,
            forwarded: 0,
            skipped_ineligible: 0,
            duplicates: 0,
            abandoned: 0,
            batches: 0,
            rate_limit_waits: 0,
            rotations: 0,
            last_offset: None,
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}
