// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for vidrelay.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer model via `tokio-rusqlite`. One database backs the cursor
//! store, the media library, and the channel post archive.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
