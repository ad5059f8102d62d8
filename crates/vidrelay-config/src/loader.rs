// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! `./vidrelay.toml` > `~/.config/vidrelay/vidrelay.toml` > `/etc/vidrelay/vidrelay.toml`,
//! with `VIDRELAY_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VidrelayConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/vidrelay/vidrelay.toml";
pub(crate) const LOCAL_CONFIG: &str = "vidrelay.toml";

/// Sections that may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &["daemon", "telegram", "relay", "storage", "health"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vidrelay/vidrelay.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/vidrelay/vidrelay.toml`
/// 3. `~/.config/vidrelay/vidrelay.toml`
/// 4. `./vidrelay.toml`
/// 5. `VIDRELAY_*` environment variables
pub fn load_config() -> Result<VidrelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<VidrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VidrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VidrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VidrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VidrelayConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider mapping `VIDRELAY_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that underscore-containing
/// keys survive: `VIDRELAY_RELAY_BATCH_SIZE` is `relay.batch_size`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("VIDRELAY_").map(|key| {
        let key_str = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
