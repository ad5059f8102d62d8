// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end relay scenarios over the scripted transport and in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vidrelay_core::{
    ChannelHandle, Credential, JobOutcome, JobReport, MediaRecord, MediaStore, RelayError,
    RelayJob,
};
use vidrelay_relay::{CredentialPool, JobRegistry, RelayContext, RelaySettings, run_job};
use vidrelay_test_utils::{
    Fault, MemoryCursorStore, MemoryMediaStore, MockConnector, RecordingSink, channel, text_item,
    video_item,
};

const SRC: i64 = -100;
const DEST: i64 = -200;
/// Cursor record of the `source` -> `dest` pair.
const PAIR: &str = "-100:-200";
const PAIR_FLOOR: &str = "-100:-200:floor";

struct Harness {
    connector: MockConnector,
    cursors: MemoryCursorStore,
    media: MemoryMediaStore,
    sink: RecordingSink,
    ctx: RelayContext,
}

fn harness(credentials: &[&str]) -> Harness {
    harness_with(credentials, |_| {})
}

fn harness_with(credentials: &[&str], tweak: impl FnOnce(&mut RelaySettings)) -> Harness {
    let connector = MockConnector::new();
    let cursors = MemoryCursorStore::new();
    let media = MemoryMediaStore::new();
    let pool = CredentialPool::new(
        credentials
            .iter()
            .map(|id| Credential::with_token(*id, "token"))
            .collect(),
    )
    .unwrap();
    let mut settings = RelaySettings {
        pacing: Duration::from_secs(2),
        reconnect_attempts: 3,
        reconnect_delay: Duration::from_millis(500),
        record_forwarded: false,
        progress_every: 10,
        default_batch_size: 10,
    };
    tweak(&mut settings);
    let ctx = RelayContext {
        connector: Arc::new(connector.clone()),
        pool: Arc::new(pool),
        cursors: Arc::new(cursors.clone()),
        media: Some(Arc::new(media.clone())),
        settings,
    };
    Harness {
        connector,
        cursors,
        media,
        sink: RecordingSink::new(),
        ctx,
    }
}

impl Harness {
    async fn with_source(&self, items: Vec<vidrelay_core::MessageItem>) {
        self.connector.add_channel(channel(SRC, "Source"), items).await;
        self.connector.add_channel(channel(DEST, "Dest"), Vec::new()).await;
    }

    async fn run(&self, job: RelayJob) -> JobReport {
        run_job(
            &self.ctx,
            job,
            Arc::new(self.sink.clone()),
            CancellationToken::new(),
        )
        .await
    }
}

fn job(batch_size: usize) -> RelayJob {
    RelayJob {
        source_channel: "source".into(),
        dest_channel: "dest".into(),
        batch_size,
        explicit_start: None,
    }
}

fn videos(ids: std::ops::RangeInclusive<i64>) -> Vec<vidrelay_core::MessageItem> {
    ids.map(|id| video_item(SRC, id)).collect()
}

#[tokio::test(start_paused = true)]
async fn batch_of_fifty_to_forty_one_commits_forty() {
    let h = harness(&["a"]);
    h.with_source(videos(41..=50)).await;

    let report = h.run(job(10)).await;

    assert_eq!(report.outcome, JobOutcome::Exhausted);
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![40, 0]);
    assert_eq!(h.cursors.peek(PAIR_FLOOR).await, Some(50));
    assert_eq!(
        h.connector.forwarded_ids().await,
        (41..=50).rev().collect::<Vec<_>>()
    );
    assert!(h.connector.forwarded().await.iter().all(|s| s.dest_id == DEST));
    assert_eq!(report.forwarded, 10);
    assert_eq!(report.batches, 1);
    assert_eq!(report.last_offset, Some(0));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_keeps_session_and_retries_same_item() {
    let h = harness(&["a", "b"]);
    h.with_source(videos(41..=50)).await;
    h.connector
        .fail_send(45, [Fault::RateLimited(Duration::from_secs(30))])
        .await;

    let start = tokio::time::Instant::now();
    let report = h.run(job(10)).await;

    assert!(start.elapsed() >= Duration::from_secs(30));
    assert_eq!(h.connector.connects().await, vec!["a"]);
    assert_eq!(h.connector.attempts_for(45).await, 2);
    assert!(h.connector.send_attempts().await.iter().all(|s| s.credential_id == "a"));
    assert_eq!(
        h.connector.forwarded_ids().await,
        (41..=50).rev().collect::<Vec<_>>()
    );
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![40, 0]);
    assert_eq!(report.rate_limit_waits, 1);
    assert_eq!(report.rotations, 0);
    assert!(h.sink.saw("Waiting 30 seconds").await);
}

#[tokio::test(start_paused = true)]
async fn consecutive_rate_limits_are_all_waited_out() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=3)).await;
    h.connector
        .fail_send(
            2,
            (0..6).map(|_| Fault::RateLimited(Duration::from_secs(60))),
        )
        .await;

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.attempts_for(2).await, 7);
    assert_eq!(h.connector.forwarded_ids().await, vec![3, 2, 1]);
    assert_eq!(report.rate_limit_waits, 6);
    assert_eq!(report.abandoned, 0);
}

#[tokio::test(start_paused = true)]
async fn rejection_rotates_once_and_abandons_item() {
    let h = harness(&["a", "b"]);
    h.with_source(videos(41..=50)).await;
    h.connector
        .fail_send(45, [Fault::Rejected("CHAT_WRITE_FORBIDDEN".into())])
        .await;

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.connects().await, vec!["a", "b"]);
    assert_eq!(h.connector.disconnects().await, vec!["a", "b"]);
    assert_eq!(h.connector.attempts_for(45).await, 1);
    assert_eq!(
        h.connector.forwarded_ids().await,
        vec![50, 49, 48, 47, 46, 44, 43, 42, 41]
    );
    let sends = h.connector.send_attempts().await;
    let after = sends.iter().find(|s| s.item_id == 44).unwrap();
    assert_eq!(after.credential_id, "b");
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![40, 0]);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.rotations, 1);
    assert!(h.sink.saw("Skipped message 45").await);
    assert!(h.sink.saw("from `a` to `b`").await);
}

#[tokio::test(start_paused = true)]
async fn banned_credential_is_rotated_away_from() {
    let h = harness(&["a", "b"]);
    h.with_source(videos(1..=4)).await;
    h.connector.ban("a").await;

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.forwarded_ids().await, vec![3, 2, 1]);
    assert!(h.connector.forwarded().await.iter().all(|s| s.credential_id == "b"));
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.rotations, 1);
    assert_eq!(h.cursors.peek(PAIR).await, Some(0));
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_reconnects_and_retries_item() {
    let h = harness(&["a", "b"]);
    h.with_source(videos(41..=50)).await;
    h.connector.fail_send(45, [Fault::Disconnected]).await;

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.connects().await, vec!["a"]);
    assert_eq!(h.connector.reconnects().await, vec!["a"]);
    assert_eq!(h.connector.attempts_for(45).await, 2);
    assert_eq!(report.forwarded, 10);
    assert_eq!(report.rotations, 0);
}

#[tokio::test(start_paused = true)]
async fn unrecoverable_connection_falls_back_to_rotation() {
    let h = harness(&["a", "b"]);
    h.with_source(videos(41..=50)).await;
    h.connector.fail_send(45, [Fault::Disconnected]).await;
    h.connector.fail_reconnect("a", 100).await;

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.connects().await, vec!["a", "b"]);
    assert_eq!(h.connector.reconnects().await, vec!["a", "a", "a"]);
    assert_eq!(h.connector.attempts_for(45).await, 1);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.forwarded, 9);
}

#[tokio::test(start_paused = true)]
async fn empty_source_ends_without_cursor_writes() {
    let h = harness(&["a"]);
    h.with_source(Vec::new()).await;

    let report = h.run(job(10)).await;

    assert_eq!(report.outcome, JobOutcome::Exhausted);
    assert!(h.cursors.saves().await.is_empty());
    assert!(h.connector.send_attempts().await.is_empty());
    assert_eq!(report.batches, 0);
    assert!(h.sink.saw("No more messages to process.").await);
    assert!(h.sink.saw("Session closed.").await);
}

#[tokio::test(start_paused = true)]
async fn ineligible_item_is_skipped_without_side_effects() {
    let h = harness(&["a"]);
    h.with_source(vec![
        video_item(SRC, 49),
        text_item(SRC, 48),
        video_item(SRC, 47),
    ])
    .await;

    let report = h.run(job(10)).await;

    assert_eq!(h.cursors.saves_for(PAIR).await, vec![46, 0]);
    assert_eq!(h.connector.attempts_for(49).await, 1);
    assert_eq!(h.connector.attempts_for(48).await, 0);
    assert_eq!(h.connector.attempts_for(47).await, 1);
    assert_eq!(report.skipped_ineligible, 1);
    assert_eq!(report.forwarded, 2);
}

#[tokio::test(start_paused = true)]
async fn single_job_drains_every_page() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=25)).await;

    let report = h.run(job(10)).await;

    assert_eq!(h.cursors.saves_for(PAIR).await, vec![15, 5, 0]);
    let offsets: Vec<_> = h.connector.fetches().await.iter().map(|f| f.2).collect();
    assert_eq!(offsets, vec![0, 15, 5]);
    assert_eq!(report.forwarded, 25);
    assert_eq!(report.batches, 3);
    assert_eq!(report.outcome, JobOutcome::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn resumes_from_stored_cursor() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=50)).await;
    h.cursors.seed(PAIR, 45).await;

    h.run(job(10)).await;

    assert_eq!(h.connector.fetches().await[0].2, 45);
    assert_eq!(h.connector.forwarded_ids().await.first(), Some(&45));
    assert_eq!(h.cursors.saves_for(PAIR).await[0], 35);
}

#[tokio::test(start_paused = true)]
async fn explicit_start_overrides_stored_cursor() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=50)).await;
    h.cursors.seed(PAIR, 45).await;
    h.cursors.seed(PAIR_FLOOR, 40).await;

    let mut job = job(10);
    job.explicit_start = Some(30);
    h.run(job).await;

    assert_eq!(h.connector.fetches().await[0].2, 30);
    assert_eq!(h.connector.forwarded_ids().await.first(), Some(&30));
    assert_eq!(h.connector.forwarded_ids().await.last(), Some(&1));
    assert_eq!(h.cursors.peek(PAIR_FLOOR).await, Some(40));
}

#[tokio::test(start_paused = true)]
async fn cursor_load_failure_starts_from_head() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=5)).await;
    h.cursors.seed(PAIR, 3).await;
    h.cursors.set_fail_load(true);

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.fetches().await[0].2, 0);
    assert_eq!(report.forwarded, 5);
}

#[tokio::test(start_paused = true)]
async fn cursor_save_failure_does_not_stop_forwarding() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=20)).await;
    h.cursors.set_fail_save(true);

    let report = h.run(job(10)).await;

    assert_eq!(report.outcome, JobOutcome::Exhausted);
    assert_eq!(report.forwarded, 20);
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![10, 0]);
    assert_eq!(h.cursors.peek(PAIR).await, None);
}

#[tokio::test(start_paused = true)]
async fn known_fingerprints_are_skipped_and_new_ones_recorded() {
    let h = harness_with(&["a"], |s| s.record_forwarded = true);
    h.with_source(videos(41..=50)).await;
    let known = MediaRecord::from_item(&video_item(SRC, 48)).unwrap();
    assert!(h.media.record(&known).await.unwrap());

    let report = h.run(job(10)).await;

    assert_eq!(h.connector.attempts_for(48).await, 0);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.forwarded, 9);
    assert_eq!(h.media.count().await.unwrap(), 10);
    assert_eq!(h.cursors.peek(PAIR).await, Some(0));
}

#[tokio::test(start_paused = true)]
async fn captionless_videos_of_equal_size_are_not_duplicates() {
    let h = harness_with(&["a"], |s| s.record_forwarded = true);
    let fire = |id| {
        let mut item = video_item(SRC, id);
        item.caption = "🔥🔥".into();
        if let Some(media) = item.media.as_mut() {
            media.size_bytes = Some(5000);
        }
        item
    };
    h.with_source(vec![fire(2), fire(1)]).await;

    let report = h.run(job(10)).await;

    assert_eq!(report.forwarded, 2);
    assert_eq!(report.duplicates, 0);
    assert_eq!(h.media.count().await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn unknown_channel_ends_job_without_fetching() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=5)).await;

    let mut job = job(10);
    job.dest_channel = "nowhere".into();
    let report = h.run(job).await;

    assert_eq!(
        report.outcome,
        JobOutcome::ResolutionFailed("nowhere".into())
    );
    assert!(h.connector.fetches().await.is_empty());
    assert!(h.cursors.saves().await.is_empty());
    assert!(h.sink.saw("Channel `nowhere` not found.").await);
    assert_eq!(h.connector.disconnects().await, vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn underscores_resolve_to_spaced_titles() {
    let h = harness(&["a"]);
    h.connector
        .add_channel(
            ChannelHandle {
                id: SRC,
                title: "Old Films".into(),
                username: None,
            },
            videos(1..=2),
        )
        .await;
    h.connector.add_channel(channel(DEST, "Dest"), Vec::new()).await;

    let mut job = job(10);
    job.source_channel = "Old_Films".into();
    let report = h.run(job).await;

    assert_eq!(report.forwarded, 2);
    let resolves = h.connector.resolves().await;
    assert_eq!(&resolves[..2], &["Old_Films".to_string(), "Old Films".to_string()]);
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![0]);
}

#[tokio::test(start_paused = true)]
async fn fetch_rate_limit_is_waited_out() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=3)).await;
    h.connector
        .fail_fetch([Fault::RateLimited(Duration::from_secs(5))])
        .await;

    let report = h.run(job(10)).await;

    assert_eq!(report.rate_limit_waits, 1);
    assert_eq!(report.forwarded, 3);
}

#[tokio::test(start_paused = true)]
async fn every_tenth_id_is_announced() {
    let h = harness(&["a"]);
    h.with_source(videos(41..=50)).await;

    h.run(job(10)).await;

    assert!(h.sink.saw("Forwarded message 50.").await);
    assert!(!h.sink.saw("Forwarded message 49.").await);
    assert!(h.sink.saw("Next offset: 40").await);
}

#[tokio::test(start_paused = true)]
async fn failing_sink_never_changes_the_outcome() {
    let mut h = harness(&["a"]);
    h.sink = RecordingSink::failing();
    h.with_source(videos(1..=3)).await;

    let report = h.run(job(10)).await;

    assert_eq!(report.outcome, JobOutcome::Exhausted);
    assert_eq!(report.forwarded, 3);
}

#[tokio::test(start_paused = true)]
async fn concurrent_jobs_keep_their_own_cursors() {
    let h = harness(&["a", "b"]);
    h.connector
        .add_channel(channel(-1, "Alpha"), (101..=110).map(|id| video_item(-1, id)).collect())
        .await;
    h.connector
        .add_channel(channel(-2, "Beta"), (201..=203).map(|id| video_item(-2, id)).collect())
        .await;
    h.connector.add_channel(channel(-10, "Dest A"), Vec::new()).await;
    h.connector.add_channel(channel(-20, "Dest B"), Vec::new()).await;

    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());
    let alpha = registry
        .start(
            RelayJob {
                source_channel: "alpha".into(),
                dest_channel: "dest_a".into(),
                batch_size: 5,
                explicit_start: None,
            },
            Arc::new(h.sink.clone()),
        )
        .await
        .unwrap();
    let beta = registry
        .start(
            RelayJob {
                source_channel: "beta".into(),
                dest_channel: "dest_b".into(),
                batch_size: 5,
                explicit_start: None,
            },
            Arc::new(h.sink.clone()),
        )
        .await
        .unwrap();
    assert_eq!(registry.running_count().await, 2);

    let alpha = alpha.wait().await.unwrap();
    let beta = beta.wait().await.unwrap();

    assert_eq!(alpha.forwarded, 10);
    assert_eq!(beta.forwarded, 3);
    assert_eq!(h.cursors.saves_for("-1:-10").await, vec![105, 100, 0]);
    assert_eq!(h.cursors.saves_for("-2:-20").await, vec![200, 0]);
    assert!(
        h.cursors
            .saves()
            .await
            .iter()
            .all(|(key, _)| key.starts_with("-1:-10") || key.starts_with("-2:-20"))
    );

    let forwarded = h.connector.forwarded().await;
    assert!(forwarded.iter().filter(|s| s.dest_id == -10).all(|s| s.item_id > 100 && s.item_id <= 110));
    assert!(forwarded.iter().filter(|s| s.dest_id == -20).all(|s| s.item_id > 200));

    let mut connects = h.connector.connects().await;
    connects.sort();
    assert_eq!(connects, vec!["a", "b"]);
    assert_eq!(registry.running_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn second_job_for_same_pair_conflicts() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=50)).await;
    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());

    let first = registry
        .start(job(10), Arc::new(h.sink.clone()))
        .await
        .unwrap();
    let mut again = job(10);
    again.source_channel = "@source".into();
    let err = registry
        .start(again, Arc::new(h.sink.clone()))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RelayError::JobConflict { .. }));

    assert!(registry.cancel("source").await);
    let report = first.wait().await.unwrap();
    assert_eq!(report.outcome, JobOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn same_source_feeds_two_destinations_independently() {
    let h = harness(&["a", "b"]);
    h.with_source(videos(11..=20)).await;
    h.connector.add_channel(channel(-300, "Other Dest"), Vec::new()).await;

    let first = h.run(job(10)).await;
    let mut other = job(10);
    other.dest_channel = "other_dest".into();
    let second = h.run(other).await;

    assert_eq!(first.forwarded, 10);
    assert_eq!(second.forwarded, 10);
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![10, 0]);
    assert_eq!(h.cursors.saves_for("-100:-300").await, vec![10, 0]);
    let forwarded = h.connector.forwarded().await;
    assert_eq!(forwarded.iter().filter(|s| s.dest_id == -300).count(), 10);

    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());
    let mut to_dest = job(10);
    to_dest.explicit_start = Some(20);
    let mut to_other = to_dest.clone();
    to_other.dest_channel = "other_dest".into();
    let a = registry.start(to_dest, Arc::new(h.sink.clone())).await.unwrap();
    let b = registry.start(to_other, Arc::new(h.sink.clone())).await.unwrap();
    assert_eq!(a.wait().await.unwrap().forwarded, 10);
    assert_eq!(b.wait().await.unwrap().forwarded, 10);
}

#[tokio::test(start_paused = true)]
async fn spellings_of_one_channel_share_a_single_job() {
    let h = harness(&["a", "b"]);
    h.connector
        .add_channel(
            ChannelHandle {
                id: SRC,
                title: "Old Films".into(),
                username: None,
            },
            videos(1..=5),
        )
        .await;
    h.connector.add_channel(channel(DEST, "Dest"), Vec::new()).await;
    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());

    let mut underscored = job(10);
    underscored.source_channel = "Old_Films".into();
    let mut spaced = job(10);
    spaced.source_channel = "Old Films".into();
    let first = registry
        .start(underscored, Arc::new(h.sink.clone()))
        .await
        .unwrap();
    let second = registry
        .start(spaced, Arc::new(h.sink.clone()))
        .await
        .unwrap();

    let mut outcomes = vec![
        first.wait().await.unwrap().outcome,
        second.wait().await.unwrap().outcome,
    ];
    outcomes.retain(|o| *o != JobOutcome::Exhausted);
    assert_eq!(
        outcomes,
        vec![JobOutcome::Conflict("Old Films -> Dest".into())]
    );
    assert_eq!(h.connector.forwarded_ids().await, vec![5, 4, 3, 2, 1]);
    assert_eq!(h.cursors.saves_for(PAIR).await, vec![0]);
    assert!(h.sink.saw("A relay for Old Films -> Dest is already running.").await);
}

#[tokio::test(start_paused = true)]
async fn cancel_matches_the_resolved_channel() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=50)).await;
    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());

    let mut by_title = job(10);
    by_title.source_channel = "Source".into();
    let handle = registry
        .start(by_title, Arc::new(h.sink.clone()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(!registry.cancel("elsewhere").await);
    assert!(registry.cancel("@source").await);
    assert_eq!(handle.wait().await.unwrap().outcome, JobOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn next_walk_stops_where_the_last_one_started() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=25)).await;
    let first = h.run(job(10)).await;
    assert_eq!(first.forwarded, 25);
    assert_eq!(h.cursors.peek(PAIR).await, Some(0));
    assert_eq!(h.cursors.peek(PAIR_FLOOR).await, Some(25));

    h.connector.post(SRC, videos(26..=30)).await;
    let second = h.run(job(10)).await;

    assert_eq!(second.outcome, JobOutcome::Exhausted);
    assert_eq!(second.forwarded, 5);
    assert_eq!(
        h.connector.forwarded_ids().await[25..],
        [30, 29, 28, 27, 26]
    );
    assert_eq!(h.cursors.peek(PAIR).await, Some(0));
    assert_eq!(h.cursors.peek(PAIR_FLOOR).await, Some(30));

    let idle = h.run(job(10)).await;
    assert_eq!(idle.forwarded, 0);
}

#[tokio::test(start_paused = true)]
async fn resumed_walk_keeps_the_top_it_started_from() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=30)).await;
    h.cursors.seed(PAIR, 15).await;
    h.cursors.seed("-100:-200:top", 25).await;
    h.cursors.seed(PAIR_FLOOR, 0).await;

    let report = h.run(job(10)).await;

    assert_eq!(report.forwarded, 15);
    assert_eq!(h.cursors.peek(PAIR_FLOOR).await, Some(25));

    let catch_up = h.run(job(10)).await;
    assert_eq!(catch_up.forwarded, 5);
    assert_eq!(
        h.connector.forwarded_ids().await[15..],
        [30, 29, 28, 27, 26]
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_batch_leaves_cursor_untouched() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=50)).await;
    h.cursors.seed(PAIR, 50).await;
    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());

    let handle = registry
        .start(job(10), Arc::new(h.sink.clone()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(registry.cancel("source").await);
    let report = handle.wait().await.unwrap();

    assert_eq!(report.outcome, JobOutcome::Cancelled);
    assert!(report.forwarded > 0 && report.forwarded < 10);
    assert!(h.cursors.saves().await.is_empty());
    assert_eq!(h.cursors.peek(PAIR).await, Some(50));
    assert!(h.sink.saw("Cursor remains at 50").await);
    assert!(!registry.cancel("source").await);
}

#[tokio::test(start_paused = true)]
async fn drain_stops_all_jobs_and_refuses_new_ones() {
    let h = harness(&["a"]);
    h.with_source(videos(1..=50)).await;
    let registry = JobRegistry::new(h.ctx.clone(), CancellationToken::new());

    let handle = registry
        .start(job(10), Arc::new(h.sink.clone()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(registry.drain(Duration::from_secs(30)).await);
    assert_eq!(handle.wait().await.unwrap().outcome, JobOutcome::Cancelled);
    assert!(matches!(
        registry.start(job(10), Arc::new(h.sink.clone())).await,
        Err(RelayError::Cancelled)
    ));
}
