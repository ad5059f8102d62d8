// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job lifecycle: shared context, fire-and-forget start, cancellation, drain.
//!
//! At most one job runs per resolved channel pair. A job claims its pair in
//! the [`JobTable`] once both channels are resolved, so two spellings of the
//! same channel cannot relay it twice. Every job gets a child of the
//! registry's root token, so a single shutdown cancels them all.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;
use vidrelay_core::{
    ChannelHandle, CursorStore, JobId, JobReport, MediaStore, ProgressSink, RelayError, RelayJob,
    TransportConnector,
};

use crate::pool::CredentialPool;
use crate::processor::{RelayProcessor, name_variants};
use crate::settings::RelaySettings;

/// Everything a job needs besides its own parameters.
#[derive(Clone)]
pub struct RelayContext {
    pub connector: Arc<dyn TransportConnector>,
    pub pool: Arc<CredentialPool>,
    pub cursors: Arc<dyn CursorStore>,
    pub media: Option<Arc<dyn MediaStore>>,
    pub settings: RelaySettings,
}

/// Operator-typed channel name without surrounding whitespace or a leading `@`.
pub fn name_key(name: &str) -> String {
    name.trim().trim_start_matches('@').to_string()
}

/// Cursor record key for a resolved channel pair: `source_id:dest_id`.
pub fn cursor_key(source: &ChannelHandle, dest: &ChannelHandle) -> String {
    format!("{}:{}", source.id, dest.id)
}

/// Cursor store records kept for one channel pair.
///
/// A walk pages from the head down to the oldest message. `offset` is where
/// an interrupted walk resumes (0 starts a new walk at the head), `top` is
/// the newest id the current walk started from, and `floor` is the newest id
/// covered by the last completed walk, below which nothing is relayed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorKeys {
    pub offset: String,
    pub top: String,
    pub floor: String,
}

impl CursorKeys {
    pub fn new(source: &ChannelHandle, dest: &ChannelHandle) -> Self {
        Self::for_pair(&cursor_key(source, dest))
    }

    pub fn for_pair(pair: &str) -> Self {
        Self {
            offset: pair.to_string(),
            top: format!("{pair}:top"),
            floor: format!("{pair}:floor"),
        }
    }
}

pub fn new_job_id() -> JobId {
    JobId(Uuid::new_v4().to_string())
}

/// Runs one job in the current task. Used by the one-shot CLI relay.
pub async fn run_job(
    ctx: &RelayContext,
    job: RelayJob,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) -> JobReport {
    let job_id = new_job_id();
    let span = info_span!("relay_job", job_id = %job_id);
    RelayProcessor::new(job_id, job, ctx, sink, cancel)
        .run()
        .instrument(span)
        .await
}

/// A running job as listed to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: JobId,
    pub source: String,
    pub dest: String,
    pub started_at: DateTime<Utc>,
}

struct RunningJob {
    summary: JobSummary,
    cancel: CancellationToken,
    /// Set once both channels are resolved.
    claim: Option<Claim>,
}

struct Claim {
    pair: String,
    source: ChannelHandle,
}

impl RunningJob {
    /// `true` if this job reads from the channel the operator called `name`.
    fn reads_from(&self, name: &str) -> bool {
        if name_key(&self.summary.source) == name_key(name) {
            return true;
        }
        self.claim.as_ref().is_some_and(|c| {
            c.source.id.to_string() == name.trim()
                || name_variants(name).iter().any(|v| c.source.matches(v))
        })
    }
}

/// Running jobs, shared between the registry and the jobs it spawned.
#[derive(Clone, Default)]
pub struct JobTable {
    jobs: Arc<Mutex<HashMap<JobId, RunningJob>>>,
}

impl JobTable {
    /// Binds `job_id` to its resolved pair.
    ///
    /// Fails with the id of the job already holding the pair.
    pub async fn claim(
        &self,
        job_id: &JobId,
        source: &ChannelHandle,
        dest: &ChannelHandle,
    ) -> Result<(), JobId> {
        let pair = cursor_key(source, dest);
        let mut jobs = self.jobs.lock().await;
        if let Some((holder, _)) = jobs
            .iter()
            .find(|(id, j)| *id != job_id && j.claim.as_ref().is_some_and(|c| c.pair == pair))
        {
            return Err(holder.clone());
        }
        if let Some(job) = jobs.get_mut(job_id) {
            job.claim = Some(Claim {
                pair,
                source: source.clone(),
            });
        }
        Ok(())
    }
}

/// Handle to a spawned job.
pub struct JobHandle {
    pub job_id: JobId,
    join: JoinHandle<JobReport>,
}

impl JobHandle {
    /// Waits for the job to finish.
    pub async fn wait(self) -> Result<JobReport, RelayError> {
        self.join
            .await
            .map_err(|e| RelayError::Internal(format!("relay task failed: {e}")))
    }
}

/// Spawns and tracks relay jobs.
pub struct JobRegistry {
    ctx: RelayContext,
    table: JobTable,
    root: CancellationToken,
    tracker: TaskTracker,
}

impl JobRegistry {
    /// `root` cancels every job when it fires.
    pub fn new(ctx: RelayContext, root: CancellationToken) -> Self {
        Self {
            ctx,
            table: JobTable::default(),
            root,
            tracker: TaskTracker::new(),
        }
    }

    pub fn context(&self) -> &RelayContext {
        &self.ctx
    }

    /// Starts `job` in the background and returns immediately.
    ///
    /// Fails with [`RelayError::JobConflict`] if a running job was started
    /// with the same source and destination names, and with
    /// [`RelayError::Cancelled`] after shutdown began. Names that differ but
    /// resolve to a pair already being relayed end the new job with
    /// [`JobOutcome::Conflict`](vidrelay_core::JobOutcome::Conflict).
    pub async fn start(
        &self,
        job: RelayJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, RelayError> {
        let mut jobs = self.table.jobs.lock().await;
        if self.root.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        let (source, dest) = (name_key(&job.source_channel), name_key(&job.dest_channel));
        if jobs.values().any(|j| {
            name_key(&j.summary.source) == source && name_key(&j.summary.dest) == dest
        }) {
            return Err(RelayError::JobConflict {
                channel: format!("{} -> {}", job.source_channel, job.dest_channel),
            });
        }

        let job_id = new_job_id();
        let cancel = self.root.child_token();
        jobs.insert(
            job_id.clone(),
            RunningJob {
                summary: JobSummary {
                    job_id: job_id.clone(),
                    source: job.source_channel.clone(),
                    dest: job.dest_channel.clone(),
                    started_at: Utc::now(),
                },
                cancel: cancel.clone(),
                claim: None,
            },
        );
        drop(jobs);

        let span = info_span!("relay_job", job_id = %job_id, source = %source);
        let processor = RelayProcessor::new(job_id.clone(), job, &self.ctx, sink, cancel)
            .with_table(self.table.clone());
        let table = self.table.clone();
        let own_id = job_id.clone();
        let join = self.tracker.spawn(
            async move {
                let report = processor.run().await;
                table.jobs.lock().await.remove(&own_id);
                report
            }
            .instrument(span),
        );

        info!(job_id = %job_id, "relay job spawned");
        Ok(JobHandle { job_id, join })
    }

    /// Cancels every job reading from `source`. Returns `false` if none is running.
    ///
    /// `source` matches the name a job was started with, or the resolved
    /// channel's id, username, or title.
    pub async fn cancel(&self, source: &str) -> bool {
        let jobs = self.table.jobs.lock().await;
        let mut found = false;
        for job in jobs.values().filter(|j| j.reads_from(source)) {
            job.cancel.cancel();
            info!(job_id = %job.summary.job_id, "relay job cancellation requested");
            found = true;
        }
        found
    }

    /// Running jobs, oldest first.
    pub async fn running(&self) -> Vec<JobSummary> {
        let mut summaries: Vec<_> = self
            .table
            .jobs
            .lock()
            .await
            .values()
            .map(|j| j.summary.clone())
            .collect();
        summaries.sort_by_key(|s| s.started_at);
        summaries
    }

    pub async fn running_count(&self) -> usize {
        self.table.jobs.lock().await.len()
    }

    /// Cancels every job and waits up to `timeout` for them to stop.
    ///
    /// Returns `true` if all jobs finished in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.root.cancel();
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            info!("no relay jobs to drain");
            return true;
        }

        info!(count = pending, "waiting for relay jobs to stop");
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("all relay jobs drained");
                true
            }
            Err(_) => {
                warn!(remaining = self.tracker.len(), "drain timeout reached");
                false
            }
        }
    }
}
