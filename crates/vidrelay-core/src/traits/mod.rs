// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the relay's collaborators.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` by the relay core.

pub mod adapter;
pub mod archive;
pub mod cursor_store;
pub mod media_store;
pub mod progress;
pub mod transport;

pub use adapter::PluginAdapter;
pub use archive::PostArchive;
pub use cursor_store::CursorStore;
pub use media_store::MediaStore;
pub use progress::ProgressSink;
pub use transport::{SessionState, TransportConnector, TransportSession};
