// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vidrelay cursor` command: inspect and override stored cursors.
//!
//! Cursors belong to resolved channel pairs. Names are looked up in the
//! post archive the same way relay jobs resolve them; numeric ids are
//! accepted as they are.

use std::collections::BTreeMap;

use vidrelay_config::VidrelayConfig;
use vidrelay_core::{ChannelHandle, CursorStore, PostArchive, RelayError};
use vidrelay_relay::CursorKeys;
use vidrelay_relay::processor::name_variants;
use vidrelay_storage::SqliteStorage;

use crate::CursorCommand;
use crate::serve::open_storage;

pub async fn run_cursor(config: VidrelayConfig, action: CursorCommand) -> Result<(), RelayError> {
    let storage = open_storage(&config).await?;
    println!("{}", execute(&storage, action).await?);
    Ok(())
}

async fn execute(storage: &SqliteStorage, action: CursorCommand) -> Result<String, RelayError> {
    match action {
        CursorCommand::Show {
            source: Some(source),
            dest: Some(dest),
        } => {
            let (source, dest) = (resolve(storage, &source).await?, resolve(storage, &dest).await?);
            let keys = CursorKeys::new(&source, &dest);
            let offset = storage.cursor(&keys.offset).await?.map(|c| c.offset_id);
            let floor = storage.cursor(&keys.floor).await?.map(|c| c.offset_id);
            Ok(describe(&pair_label(&source, &dest), offset, floor))
        }
        CursorCommand::Show { .. } => {
            let mut pairs: BTreeMap<String, (Option<i64>, Option<i64>)> = BTreeMap::new();
            for cursor in storage.cursors().await? {
                if let Some(pair) = cursor.channel_id.strip_suffix(":floor") {
                    pairs.entry(pair.to_string()).or_default().1 = Some(cursor.offset_id);
                } else if !cursor.channel_id.ends_with(":top") {
                    pairs.entry(cursor.channel_id).or_default().0 = Some(cursor.offset_id);
                }
            }
            if pairs.is_empty() {
                return Ok("No cursors stored.".to_string());
            }
            let lines: Vec<String> = pairs
                .iter()
                .map(|(pair, (offset, floor))| describe(pair, *offset, *floor))
                .collect();
            Ok(lines.join("\n"))
        }
        CursorCommand::Set {
            source,
            dest,
            offset,
        } => {
            let (source, dest) = (resolve(storage, &source).await?, resolve(storage, &dest).await?);
            let keys = CursorKeys::new(&source, &dest);
            storage.save(&keys.offset, offset).await?;
            Ok(format!(
                "{}: cursor set to {offset}",
                pair_label(&source, &dest)
            ))
        }
    }
}

/// Archived channel by name (underscores read as spaces too), else a numeric id.
async fn resolve(storage: &SqliteStorage, name: &str) -> Result<ChannelHandle, RelayError> {
    for candidate in name_variants(name) {
        if let Some(channel) = storage.find_channel(&candidate).await? {
            return Ok(channel);
        }
    }
    let id = name
        .trim()
        .parse::<i64>()
        .map_err(|_| RelayError::Resolution {
            channel: name.to_string(),
        })?;
    Ok(ChannelHandle {
        id,
        title: id.to_string(),
        username: None,
    })
}

fn pair_label(source: &ChannelHandle, dest: &ChannelHandle) -> String {
    format!("{} -> {} ({}:{})", source.title, dest.title, source.id, dest.id)
}

fn describe(label: &str, offset: Option<i64>, floor: Option<i64>) -> String {
    let mut line = match offset {
        Some(offset) if offset > 0 => format!("{label}: resumes at {offset}"),
        Some(_) => format!("{label}: next relay starts at the newest message"),
        None => format!("{label}: no cursor, next relay starts at the newest message"),
    };
    if let Some(floor) = floor.filter(|f| *f > 0) {
        line.push_str(&format!(" and stops after {floor}"));
    }
    line
}
