// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions over the relay schema.

pub mod cursors;
pub mod media;
pub mod posts;
