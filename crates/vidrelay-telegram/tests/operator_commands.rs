// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator commands executed against a registry backed by the mock transport.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vidrelay_core::{Credential, MediaRecord, MediaStore};
use vidrelay_relay::{CredentialPool, JobRegistry, RelayContext, RelaySettings};
use vidrelay_telegram::{BotState, Command, execute};
use vidrelay_test_utils::{
    MemoryCursorStore, MemoryMediaStore, MemoryPostArchive, MockConnector, RecordingSink, channel,
    video_item,
};

struct Fixture {
    connector: MockConnector,
    cursors: MemoryCursorStore,
    media: MemoryMediaStore,
    sink: RecordingSink,
    state: BotState,
}

async fn fixture() -> Fixture {
    let connector = MockConnector::new();
    connector
        .add_channel(channel(-1, "Films"), (1..=30).map(|id| video_item(-1, id)).collect())
        .await;
    connector.add_channel(channel(-2, "Backup"), Vec::new()).await;

    let cursors = MemoryCursorStore::new();
    let media = MemoryMediaStore::new();
    let ctx = RelayContext {
        connector: Arc::new(connector.clone()),
        pool: Arc::new(CredentialPool::new(vec![Credential::with_token("a", "t")]).unwrap()),
        cursors: Arc::new(cursors.clone()),
        media: Some(Arc::new(media.clone())),
        settings: RelaySettings {
            pacing: Duration::from_secs(1),
            ..RelaySettings::default()
        },
    };
    let state = BotState {
        registry: Arc::new(JobRegistry::new(ctx, CancellationToken::new())),
        media: Arc::new(media.clone()),
        archive: Arc::new(MemoryPostArchive::new()),
        operators: vec![42],
    };
    Fixture {
        connector,
        cursors,
        media,
        sink: RecordingSink::new(),
        state,
    }
}

impl Fixture {
    async fn run(&self, cmd: Command) -> String {
        execute(&self.state, cmd, Arc::new(self.sink.clone())).await
    }
}

#[tokio::test(start_paused = true)]
async fn relay_is_acknowledged_immediately_and_runs_in_background() {
    let f = fixture().await;

    let reply = f.run(Command::Relay("films backup 0 10".into())).await;
    assert!(reply.starts_with("Relay started from `films` to `backup`"), "{reply}");
    assert_eq!(f.state.registry.running_count().await, 1);

    let jobs = f.run(Command::Jobs).await;
    assert!(jobs.contains("films -> backup"), "{jobs}");

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(f.state.registry.running_count().await, 0);
    assert_eq!(f.connector.forwarded_ids().await.len(), 30);
    assert_eq!(f.cursors.peek("-1:-2").await, Some(0));
    assert!(f.sink.saw("No more messages to process.").await);
    assert_eq!(f.run(Command::Jobs).await, "No relays running.");
}

#[tokio::test(start_paused = true)]
async fn second_relay_for_same_pair_is_refused() {
    let f = fixture().await;
    f.run(Command::Relay("films backup".into())).await;

    let reply = f.run(Command::Relay("@films backup".into())).await;
    assert_eq!(reply, "A relay for `@films -> backup` is already running.");

    assert_eq!(
        f.run(Command::Cancel("films".into())).await,
        "Cancelling relays from `films`."
    );
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        f.run(Command::Cancel("films".into())).await,
        "No relay from `films` is running."
    );
}

#[tokio::test]
async fn bad_relay_arguments_return_usage() {
    let f = fixture().await;
    let reply = f.run(Command::Relay("films".into())).await;
    assert!(reply.starts_with("Usage: /relay"));
    assert_eq!(f.state.registry.running_count().await, 0);
}

#[tokio::test]
async fn total_videos_counts_the_library() {
    let f = fixture().await;
    for id in 1..=3 {
        let record = MediaRecord::from_item(&video_item(-1, id)).unwrap();
        f.media.record(&record).await.unwrap();
    }
    assert_eq!(
        f.run(Command::TotalVideos).await,
        "Total videos in the library: 3"
    );
}

#[tokio::test]
async fn help_lists_every_command() {
    let f = fixture().await;
    let help = f.run(Command::Help).await;
    for name in ["/relay", "/cancel", "/jobs", "/totalvideos", "/help"] {
        assert!(help.contains(name), "missing {name} in {help}");
    }
}
