// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job FSM that drains a source channel into a destination channel.
//!
//! A job goes through: Idle -> Resolving -> Fetching -> ProcessingItem ->
//! (BatchDone | Rotating | Backoff) -> Fetching, until it reaches Terminal.
//!
//! Within a job everything is sequential. The processor integrates:
//! - **Session rotator**: one live session per job, rotated on rejection
//! - **Backoff controller**: provider-dictated waits on rate limits
//! - **Cursor store**: one commit per completed batch, never mid-batch, keyed
//!   by the resolved channel pair
//! - **Media store**: optional duplicate detection for forwarded videos

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidrelay_core::{
    ChannelHandle, CursorStore, JobId, JobOutcome, JobReport, MediaRecord, MediaStore,
    MessageItem, ProgressSink, RelayJob, TransportError,
};

use crate::backoff::{BackoffController, Recovery, classify, pause};
use crate::fetcher::{Batch, BatchFetcher};
use crate::job::{CursorKeys, JobTable, RelayContext};
use crate::pool::{ReconnectPolicy, SessionRotator};
use crate::progress::{ProgressEvent, Reporter};
use crate::settings::RelaySettings;

/// States in the relay FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Created, not started.
    Idle,
    /// Mapping an operator-supplied name to a channel handle.
    Resolving,
    /// Requesting the next page from the source.
    Fetching,
    /// Forwarding the items of the current page.
    ProcessingItem,
    /// Every item of the page attempted; committing the cursor.
    BatchDone,
    /// Swapping to the next credential after a rejection.
    Rotating,
    /// Waiting out a rate limit.
    Backoff,
    /// Finished: exhausted, failed, or cancelled.
    Terminal,
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayState::Idle => write!(f, "idle"),
            RelayState::Resolving => write!(f, "resolving"),
            RelayState::Fetching => write!(f, "fetching"),
            RelayState::ProcessingItem => write!(f, "processing_item"),
            RelayState::BatchDone => write!(f, "batch_done"),
            RelayState::Rotating => write!(f, "rotating"),
            RelayState::Backoff => write!(f, "backoff"),
            RelayState::Terminal => write!(f, "terminal"),
        }
    }
}

/// Why the job left its loop early.
#[derive(Debug)]
enum Stop {
    Cancelled,
    Unresolved(String),
    Conflict { pair: String, holder: JobId },
    Failed(String),
}

/// What to do after recovering from one failed transport call.
enum Next {
    Retry,
    GiveUp(TransportError),
}

/// Recovery budget for a single transport call.
///
/// A dropped connection gets one reconnect round (the rotator's own bounded
/// retries); a second drop within the same call falls through to rotation.
struct Attempt {
    reconnected: bool,
    rotations: usize,
    max_rotations: usize,
    retry_after_rotation: bool,
}

impl Attempt {
    /// Forwarding: one rotation, then the item is abandoned.
    fn item() -> Self {
        Self {
            reconnected: false,
            rotations: 0,
            max_rotations: 1,
            retry_after_rotation: false,
        }
    }

    /// Resolution and fetching: may try every credential once.
    fn request(pool_size: usize) -> Self {
        Self {
            reconnected: false,
            rotations: 0,
            max_rotations: pool_size.max(1),
            retry_after_rotation: true,
        }
    }
}

/// Name forms tried when resolving: the name as typed, then with `_` read as a space.
pub fn name_variants(name: &str) -> Vec<String> {
    let raw = name.trim().to_string();
    let spaced = raw.replace('_', " ");
    if spaced == raw {
        vec![raw]
    } else {
        vec![raw, spaced]
    }
}

/// Where this job's walk starts and where it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Walk {
    offset: i64,
    /// Ids at or below this are not relayed again.
    floor: i64,
    /// Floor left by the last completed walk.
    known_floor: i64,
    /// Newest id of the walk; 0 while unknown.
    top: i64,
}

/// Runs one [`RelayJob`] to completion or cancellation.
pub struct RelayProcessor {
    job_id: JobId,
    job: RelayJob,
    table: Option<JobTable>,
    start_index: usize,
    rotator: SessionRotator,
    cursors: Arc<dyn CursorStore>,
    media: Option<Arc<dyn MediaStore>>,
    reporter: Reporter,
    settings: RelaySettings,
    cancel: CancellationToken,
    backoff: BackoffController,
    state: RelayState,
    committed: i64,
    report: JobReport,
}

impl RelayProcessor {
    /// Builds a processor; the starting credential is assigned round-robin from the pool.
    pub fn new(
        job_id: JobId,
        mut job: RelayJob,
        ctx: &RelayContext,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Self {
        if job.batch_size == 0 {
            job.batch_size = ctx.settings.default_batch_size;
        }
        let rotator = SessionRotator::new(
            Arc::clone(&ctx.pool),
            Arc::clone(&ctx.connector),
            ReconnectPolicy {
                attempts: ctx.settings.reconnect_attempts,
                delay: ctx.settings.reconnect_delay,
            },
            cancel.clone(),
        );
        Self {
            table: None,
            start_index: ctx.pool.assign(),
            report: JobReport::new(job_id.clone()),
            reporter: Reporter::new(job_id.clone(), sink),
            backoff: BackoffController::new(cancel.clone()),
            job_id,
            job,
            rotator,
            cursors: Arc::clone(&ctx.cursors),
            media: ctx.media.clone(),
            settings: ctx.settings.clone(),
            cancel,
            state: RelayState::Idle,
            committed: 0,
        }
    }

    /// Registers the processor with a registry's table, so it claims its
    /// channel pair once resolved.
    pub fn with_table(mut self, table: JobTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Drives the job to a terminal state and returns its report.
    ///
    /// The session is always closed on the way out, and the cursor holds the
    /// last committed value whatever the outcome.
    pub async fn run(mut self) -> JobReport {
        info!(
            job_id = %self.job_id,
            source = %self.job.source_channel,
            dest = %self.job.dest_channel,
            "relay job started"
        );

        let outcome = match self.drive().await {
            Ok(()) => JobOutcome::Exhausted,
            Err(Stop::Cancelled) => {
                info!(job_id = %self.job_id, offset = self.committed, "relay job cancelled");
                self.reporter
                    .emit(ProgressEvent::Cancelled {
                        offset: self.committed,
                    })
                    .await;
                JobOutcome::Cancelled
            }
            Err(Stop::Unresolved(channel)) => {
                warn!(job_id = %self.job_id, channel = %channel, "channel not found");
                self.reporter
                    .emit(ProgressEvent::ChannelMissing {
                        channel: channel.clone(),
                    })
                    .await;
                JobOutcome::ResolutionFailed(channel)
            }
            Err(Stop::Conflict { pair, holder }) => {
                warn!(job_id = %self.job_id, pair = %pair, holder = %holder, "channel pair already being relayed");
                self.reporter
                    .emit(ProgressEvent::AlreadyRunning { pair: pair.clone() })
                    .await;
                JobOutcome::Conflict(pair)
            }
            Err(Stop::Failed(error)) => {
                warn!(job_id = %self.job_id, error = %error, "relay job failed");
                self.reporter
                    .emit(ProgressEvent::CriticalError {
                        error: error.clone(),
                    })
                    .await;
                JobOutcome::Failed(error)
            }
        };

        self.transition(RelayState::Terminal);
        self.rotator.close().await;
        self.reporter.emit(ProgressEvent::Closed).await;

        self.report.outcome = outcome;
        self.report.rotations = self.rotator.rotations();
        self.report.rate_limit_waits = self.backoff.waits();
        info!(
            job_id = %self.job_id,
            outcome = %self.report.outcome,
            forwarded = self.report.forwarded,
            batches = self.report.batches,
            rate_limited_secs = self.backoff.waited().as_secs(),
            "relay job finished"
        );
        self.report
    }

    async fn drive(&mut self) -> Result<(), Stop> {
        self.check_cancel()?;
        self.connect().await?;

        let source_name = self.job.source_channel.clone();
        let dest_name = self.job.dest_channel.clone();
        let source = self.resolve(&source_name, "source").await?;
        let dest = self.resolve(&dest_name, "destination").await?;
        self.claim(&source, &dest).await?;

        let keys = CursorKeys::new(&source, &dest);
        let mut walk = self.start_walk(&keys).await;
        self.committed = walk.offset;
        self.reporter
            .emit(ProgressEvent::Resuming {
                offset: walk.offset,
            })
            .await;

        let fetcher = BatchFetcher::new(self.job.batch_size);
        loop {
            self.check_cancel()?;
            self.transition(RelayState::Fetching);
            let offset = walk.offset;
            self.reporter.emit(ProgressEvent::Fetching { offset }).await;

            let batch = self.fetch(&fetcher, &source, offset).await?;
            if batch.is_empty() {
                info!(job_id = %self.job_id, offset, "source exhausted");
                if offset > 0 {
                    self.finish_walk(&keys, &walk).await;
                }
                self.reporter.emit(ProgressEvent::Exhausted).await;
                return Ok(());
            }
            debug!(job_id = %self.job_id, offset, items = batch.items.len(), "batch fetched");

            if offset == 0 && walk.top == 0 {
                walk.top = batch.items.iter().map(|i| i.id).max().unwrap_or(0);
                self.store(&keys.top, walk.top).await;
            }
            let reached_floor = walk.floor > 0 && batch.items.iter().any(|i| i.id <= walk.floor);

            self.transition(RelayState::ProcessingItem);
            let mut forwarded = 0;
            for item in batch.items.iter().filter(|i| i.id > walk.floor) {
                self.check_cancel()?;
                if self.process_item(&dest, item).await? {
                    forwarded += 1;
                }
            }

            self.transition(RelayState::BatchDone);
            let next = if reached_floor {
                0
            } else {
                batch.next_offset().unwrap_or(0)
            };
            self.commit(&keys, next).await;
            self.report.batches += 1;
            self.reporter
                .emit(ProgressEvent::BatchDone {
                    next_offset: next,
                    forwarded,
                })
                .await;

            if next == 0 || batch.items.len() < fetcher.batch_size() {
                info!(job_id = %self.job_id, floor = walk.floor, "reached the oldest unrelayed message");
                self.finish_walk(&keys, &walk).await;
                self.reporter.emit(ProgressEvent::Exhausted).await;
                return Ok(());
            }
            walk.offset = next;
        }
    }

    /// Opens the first session, falling through the pool if the assigned credential fails.
    async fn connect(&mut self) -> Result<(), Stop> {
        if let Err(e) = self.rotator.activate(self.start_index).await {
            warn!(
                job_id = %self.job_id,
                credential = %self.rotator.credential_id(),
                error = %e,
                "assigned credential failed to connect"
            );
            self.rotator
                .rotate()
                .await
                .map_err(|e| Stop::Failed(format!("no credential could connect: {e}")))?;
        }
        self.reporter
            .emit(ProgressEvent::Connected {
                credential: self.rotator.credential_id().to_string(),
            })
            .await;
        Ok(())
    }

    async fn resolve(&mut self, name: &str, role: &'static str) -> Result<ChannelHandle, Stop> {
        self.transition(RelayState::Resolving);
        for candidate in name_variants(name) {
            let mut attempt = Attempt::request(self.rotator.pool_size());
            loop {
                let result = match self.rotator.session() {
                    Ok(session) => session.resolve_channel(&candidate).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(Some(channel)) => {
                        info!(job_id = %self.job_id, role, channel = %channel, "channel resolved");
                        self.reporter
                            .emit(ProgressEvent::ChannelFound {
                                role,
                                channel: channel.clone(),
                            })
                            .await;
                        return Ok(channel);
                    }
                    Ok(None) => break,
                    Err(e) => match self.recover(e, &mut attempt).await? {
                        Next::Retry => continue,
                        Next::GiveUp(e) => {
                            return Err(Stop::Failed(format!("resolving `{name}`: {e}")));
                        }
                    },
                }
            }
        }
        Err(Stop::Unresolved(name.to_string()))
    }

    async fn claim(&self, source: &ChannelHandle, dest: &ChannelHandle) -> Result<(), Stop> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        table
            .claim(&self.job_id, source, dest)
            .await
            .map_err(|holder| Stop::Conflict {
                pair: format!("{} -> {}", source.title, dest.title),
                holder,
            })
    }

    /// Explicit start wins and relays everything below it; otherwise the
    /// stored offset, bounded below by the last completed walk.
    async fn start_walk(&self, keys: &CursorKeys) -> Walk {
        let known_floor = self.load(&keys.floor).await;
        if let Some(start) = self.job.explicit_start {
            info!(job_id = %self.job_id, offset = start, "using explicit start offset");
            return Walk {
                offset: start.max(0),
                floor: 0,
                known_floor,
                top: 0,
            };
        }
        let offset = self.load(&keys.offset).await;
        let top = if offset > 0 {
            self.load(&keys.top).await
        } else {
            0
        };
        Walk {
            offset,
            floor: known_floor,
            known_floor,
            top,
        }
    }

    /// Reads one cursor record; an unreadable record counts as unset.
    async fn load(&self, key: &str) -> i64 {
        match self.cursors.load(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    job_id = %self.job_id,
                    key = %key,
                    error = %e,
                    "cursor load failed, treating it as unset"
                );
                0
            }
        }
    }

    async fn fetch(
        &mut self,
        fetcher: &BatchFetcher,
        source: &ChannelHandle,
        offset: i64,
    ) -> Result<Batch, Stop> {
        let mut attempt = Attempt::request(self.rotator.pool_size());
        loop {
            let result = match self.rotator.session() {
                Ok(session) => fetcher.fetch(session, source, offset).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(batch) => return Ok(batch),
                Err(e) => match self.recover(e, &mut attempt).await? {
                    Next::Retry => continue,
                    Next::GiveUp(e) => {
                        return Err(Stop::Failed(format!("fetching at offset {offset}: {e}")));
                    }
                },
            }
        }
    }

    /// Forwards one item. Returns `true` if it was delivered.
    async fn process_item(
        &mut self,
        dest: &ChannelHandle,
        item: &MessageItem,
    ) -> Result<bool, Stop> {
        if !item.has_video_media() {
            self.report.skipped_ineligible += 1;
            debug!(job_id = %self.job_id, item_id = item.id, "not a video, skipped");
            return Ok(false);
        }

        let record = self
            .settings
            .record_forwarded
            .then(|| MediaRecord::from_item(item))
            .flatten();
        if let (Some(store), Some(record)) = (&self.media, &record) {
            match store.contains(&record.fingerprint()).await {
                Ok(true) => {
                    self.report.duplicates += 1;
                    debug!(job_id = %self.job_id, item_id = item.id, "duplicate video, skipped");
                    return Ok(false);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(job_id = %self.job_id, item_id = item.id, error = %e, "duplicate check failed");
                }
            }
        }

        let mut attempt = Attempt::item();
        loop {
            let result = match self.rotator.session() {
                Ok(session) => session.send_media(dest, item).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => break,
                Err(e) => match self.recover(e, &mut attempt).await? {
                    Next::Retry => continue,
                    Next::GiveUp(e) => {
                        self.report.abandoned += 1;
                        warn!(job_id = %self.job_id, item_id = item.id, error = %e, "item abandoned");
                        self.reporter
                            .emit(ProgressEvent::ItemAbandoned { item_id: item.id })
                            .await;
                        self.transition(RelayState::ProcessingItem);
                        return Ok(false);
                    }
                },
            }
        }

        self.transition(RelayState::ProcessingItem);
        self.report.forwarded += 1;
        debug!(job_id = %self.job_id, item_id = item.id, "item forwarded");

        if let (Some(store), Some(record)) = (&self.media, &record)
            && let Err(e) = store.record(record).await
        {
            warn!(job_id = %self.job_id, item_id = item.id, error = %e, "failed to record forwarded video");
        }
        if self.settings.progress_every > 0 && item.id % self.settings.progress_every == 0 {
            self.reporter
                .emit(ProgressEvent::Forwarded { item_id: item.id })
                .await;
        }

        if !pause(self.settings.pacing, &self.cancel).await {
            return Err(Stop::Cancelled);
        }
        Ok(true)
    }

    /// Applies the recovery action for `err` within the budget of `attempt`.
    async fn recover(&mut self, err: TransportError, attempt: &mut Attempt) -> Result<Next, Stop> {
        match classify(&err) {
            Recovery::Backoff(wait) => {
                self.transition(RelayState::Backoff);
                warn!(
                    job_id = %self.job_id,
                    credential = %self.rotator.credential_id(),
                    wait_secs = wait.as_secs(),
                    "rate limited"
                );
                self.reporter
                    .emit(ProgressEvent::RateLimited { wait })
                    .await;
                if self.backoff.wait(wait).await {
                    Ok(Next::Retry)
                } else {
                    Err(Stop::Cancelled)
                }
            }
            Recovery::Reconnect if !attempt.reconnected => {
                attempt.reconnected = true;
                debug!(
                    job_id = %self.job_id,
                    credential = %self.rotator.credential_id(),
                    error = %err,
                    "connection lost, reconnecting"
                );
                match self.rotator.ensure_connected().await {
                    Ok(()) => Ok(Next::Retry),
                    Err(_) if self.cancel.is_cancelled() => Err(Stop::Cancelled),
                    Err(e) => self.rotate_after(e, attempt).await,
                }
            }
            Recovery::Reconnect | Recovery::Rotate => self.rotate_after(err, attempt).await,
        }
    }

    async fn rotate_after(
        &mut self,
        err: TransportError,
        attempt: &mut Attempt,
    ) -> Result<Next, Stop> {
        if attempt.rotations >= attempt.max_rotations {
            return Ok(Next::GiveUp(err));
        }
        attempt.rotations += 1;
        self.transition(RelayState::Rotating);

        let from = self.rotator.credential_id().to_string();
        warn!(job_id = %self.job_id, credential = %from, error = %err, "rotating credential");
        self.rotator
            .rotate()
            .await
            .map_err(|e| Stop::Failed(format!("no credential could connect: {e}")))?;
        self.reporter
            .emit(ProgressEvent::Rotated {
                from,
                to: self.rotator.credential_id().to_string(),
            })
            .await;

        if attempt.retry_after_rotation {
            Ok(Next::Retry)
        } else {
            Ok(Next::GiveUp(err))
        }
    }

    /// Persists the resume offset of the walk.
    async fn commit(&mut self, keys: &CursorKeys, offset: i64) {
        if self.store(&keys.offset, offset).await {
            debug!(job_id = %self.job_id, pair = %keys.offset, offset, "cursor committed");
        }
        self.committed = offset;
        self.report.last_offset = Some(offset);
    }

    /// Ends the walk: the next run starts at the head and stops at this walk's top.
    async fn finish_walk(&mut self, keys: &CursorKeys, walk: &Walk) {
        if self.committed != 0 {
            self.commit(keys, 0).await;
        }
        let floor = walk.known_floor.max(walk.top);
        if floor > walk.known_floor {
            self.store(&keys.floor, floor).await;
        }
    }

    /// Writes one cursor record. A failed write is logged and otherwise ignored.
    async fn store(&self, key: &str, value: i64) -> bool {
        match self.cursors.save(key, value).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    job_id = %self.job_id,
                    key = %key,
                    value,
                    error = %e,
                    "cursor save failed, items since the last commit may be relayed again"
                );
                false
            }
        }
    }

    fn check_cancel(&self) -> Result<(), Stop> {
        if self.cancel.is_cancelled() {
            Err(Stop::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: RelayState) {
        if self.state != next {
            debug!(job_id = %self.job_id, from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }
}
