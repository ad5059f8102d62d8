// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use vidrelay_core::Credential;

/// Top-level vidrelay configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VidrelayConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Operator bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Relay pacing and recovery settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Ordered credential pool. Never serialized.
    #[serde(default, skip_serializing)]
    pub credentials: Vec<CredentialConfig>,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP health endpoint.
    #[serde(default)]
    pub health: HealthConfig,
}

impl VidrelayConfig {
    /// The credential pool in configured order.
    pub fn pool_credentials(&self) -> Vec<Credential> {
        self.credentials.iter().map(CredentialConfig::to_credential).collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Operator bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram user ids allowed to issue commands and upload media.
    #[serde(default)]
    pub operators: Vec<i64>,

    /// Send a forward notice whenever a forwarded id is a multiple of this value. 0 disables.
    #[serde(default = "default_progress_every")]
    pub progress_every: i64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            operators: Vec::new(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_progress_every() -> i64 {
    10
}

/// Relay loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Default page size when a job does not specify one.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause after every successful forward, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Reconnect attempts with the same credential before rotating.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Delay between reconnect attempts, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Record forwarded items in the media store and skip fingerprint duplicates.
    #[serde(default = "default_record_forwarded")]
    pub record_forwarded: bool,

    /// How long shutdown waits for running jobs to stop.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            pacing_ms: default_pacing_ms(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            record_forwarded: default_record_forwarded(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_pacing_ms() -> u64 {
    2000
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_record_forwarded() -> bool {
    true
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// One `[[credentials]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
    pub id: String,
    #[serde(default)]
    pub application_id: Option<i64>,
    #[serde(default)]
    pub application_secret: Option<SecretString>,
    pub session_token: SecretString,
}

impl CredentialConfig {
    pub fn to_credential(&self) -> Credential {
        Credential {
            id: self.id.clone(),
            application_id: self.application_id,
            application_secret: self.application_secret.clone(),
            session_token: self.session_token.clone(),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("vidrelay").join("vidrelay.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("vidrelay.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,

    #[serde(default = "default_health_host")]
    pub host: String,

    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            host: default_health_host(),
            port: default_health_port(),
        }
    }
}

fn default_health_enabled() -> bool {
    true
}

fn default_health_host() -> String {
    "127.0.0.1".to_string()
}

fn default_health_port() -> u16 {
    3000
}
