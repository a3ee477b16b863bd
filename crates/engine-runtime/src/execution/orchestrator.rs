use crate::{error::IngestError, execution::source::OpenedInput};
use connectors::{file::csv::source::CsvRowSource, table::TableStore};
use engine_config::settings::IngestSettings;
use engine_core::{metrics::Metrics, state::StateStore};
use engine_processing::{
    batcher::PartitionBatcher,
    committer::{BatchCommitter, Prepared},
    keys::KeyResolver,
};
use model::{
    execution::{job::JobSpec, progress::ProgressStatus},
    records::{batch::Batch, row::Row},
};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Init,
    ResolveCheckpoint,
    Scanning,
    Draining,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestPhase::Init => "init",
            IngestPhase::ResolveCheckpoint => "resolve-checkpoint",
            IngestPhase::Scanning => "scanning",
            IngestPhase::Draining => "draining",
            IngestPhase::Finalizing => "finalizing",
            IngestPhase::Done => "done",
            IngestPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where a run starts from after looking at the stored checkpoint.
#[derive(Debug)]
enum Resume {
    /// Nothing to do; the stored status is returned as is.
    AlreadyCompleted(ProgressStatus),
    /// Start or continue; batches ending at or below `threshold` are already durable.
    Start {
        status: ProgressStatus,
        threshold: u64,
    },
}

/// Drives one upload session through its phases.
pub struct Orchestrator {
    tables: Arc<dyn TableStore>,
    state: Arc<dyn StateStore>,
    settings: IngestSettings,
    metrics: Metrics,
}

impl Orchestrator {
    pub fn new(
        tables: Arc<dyn TableStore>,
        state: Arc<dyn StateStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            tables,
            state,
            settings,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn run(
        &self,
        job: &JobSpec,
        input: OpenedInput,
        cancel: &CancellationToken,
    ) -> Result<ProgressStatus, IngestError> {
        debug!(phase = %IngestPhase::Init, table = %job.table, "Entering phase");
        let input_length = input.length;
        let fingerprint = input.fingerprint;
        let mut source =
            CsvRowSource::open(input.reader, input_length, self.settings.csv_options())?;

        // A zero-byte input has no header, so there are no keys to resolve.
        let keys = if source.has_header() {
            Some(KeyResolver::resolve(
                source.headers(),
                &job.partition_key,
                &job.row_key,
            )?)
        } else {
            None
        };

        debug!(phase = %IngestPhase::ResolveCheckpoint, "Entering phase");
        let resume = self
            .resolve_checkpoint(job, fingerprint, input_length)
            .await?;
        let (status, threshold) = match resume {
            Resume::AlreadyCompleted(status) => {
                info!(
                    table = %job.table,
                    total_committed = status.total_committed,
                    "Input was already uploaded, nothing to do"
                );
                return Ok(status);
            }
            Resume::Start { status, threshold } => (status, threshold),
        };

        self.tables.ensure_table(&job.table).await?;
        self.state.save_progress(job, &status).await?;

        let committer = keys.map(|keys| {
            BatchCommitter::new(
                Arc::clone(&self.tables),
                job.table.clone(),
                source.headers().to_vec(),
                keys,
                self.settings.value_mode,
                self.settings.retry_policy(),
                self.metrics.clone(),
            )
        });

        let mut session = Session::new(
            job,
            &self.settings,
            self.state.as_ref(),
            &self.metrics,
            cancel,
            status,
            threshold,
        );

        match session.drive(&mut source, committer.as_ref()).await {
            Ok(()) => {
                session.phase(IngestPhase::Done);
                let snapshot = self.metrics.snapshot();
                info!(
                    table = %job.table,
                    session = session.status.session_counter,
                    rows_read = session.status.total_read,
                    rows_committed = session.status.total_committed,
                    rows_skipped = session.status.total_skipped,
                    batches = snapshot.batches_committed,
                    batches_replayed = snapshot.batches_replayed,
                    retries = snapshot.retry_count,
                    elapsed_ms = session.status.time_in_read_ms,
                    "Upload completed"
                );
                Ok(session.status)
            }
            Err(err @ IngestError::Cancelled { .. }) => Err(err),
            Err(err) => {
                session.phase(IngestPhase::Failed);
                self.metrics.increment_failures(1);
                error!(
                    table = %job.table,
                    rows_read = session.status.total_read,
                    rows_committed = session.status.total_committed,
                    error = %err,
                    "Upload failed"
                );
                session.save_after_failure().await;
                Err(IngestError::RunFailed {
                    rows_read: session.status.total_read,
                    rows_committed: session.status.total_committed,
                    source: Box::new(err),
                })
            }
        }
    }

    async fn resolve_checkpoint(
        &self,
        job: &JobSpec,
        fingerprint: Option<String>,
        input_length: u64,
    ) -> Result<Resume, IngestError> {
        let stored = self.state.load_progress(job).await?;

        let max_batch_size = self.settings.max_batch_size;
        let fresh = |fingerprint: Option<String>| Resume::Start {
            status: ProgressStatus::fresh(fingerprint, input_length, max_batch_size),
            threshold: 0,
        };

        let resume = match stored {
            Some(status) if status.matches_input(fingerprint.as_deref()) && status.completed => {
                Resume::AlreadyCompleted(status)
            }
            Some(mut status)
                if status.matches_input(fingerprint.as_deref())
                    && status.matches_batching(max_batch_size) =>
            {
                let threshold = status.begin_resume(input_length);
                info!(
                    session = status.session_counter,
                    threshold,
                    total_read = status.total_read,
                    "Resuming interrupted upload"
                );
                Resume::Start { status, threshold }
            }
            Some(status) if status.matches_input(fingerprint.as_deref()) => {
                warn!(
                    stored = status.max_batch_size,
                    current = max_batch_size,
                    "Batch size changed since the last session, restarting from the beginning"
                );
                fresh(fingerprint)
            }
            Some(status) => {
                warn!(
                    stored = ?status.input_fingerprint,
                    current = ?fingerprint,
                    "Input changed since the last session, restarting from the beginning"
                );
                fresh(fingerprint)
            }
            None => {
                info!(input_length, "Starting new upload");
                fresh(fingerprint)
            }
        };
        Ok(resume)
    }
}

/// Counters persisted by earlier sessions. The re-scan of a resumed session
/// recomputes the same figures, so the persisted ones are lower bounds.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    total_read: u64,
    total_skipped: u64,
    progress_bytes: u64,
    time_in_read_ms: u64,
    time_in_commit_ms: u64,
}

struct Session<'a> {
    job: &'a JobSpec,
    settings: &'a IngestSettings,
    state: &'a dyn StateStore,
    metrics: &'a Metrics,
    cancel: &'a CancellationToken,
    status: ProgressStatus,
    threshold: u64,
    baseline: Baseline,
    rows_read: u64,
    rows_skipped: u64,
    started: Instant,
    commit_time: Duration,
    current: IngestPhase,
}

impl<'a> Session<'a> {
    fn new(
        job: &'a JobSpec,
        settings: &'a IngestSettings,
        state: &'a dyn StateStore,
        metrics: &'a Metrics,
        cancel: &'a CancellationToken,
        status: ProgressStatus,
        threshold: u64,
    ) -> Self {
        let baseline = Baseline {
            total_read: status.total_read,
            total_skipped: status.total_skipped,
            progress_bytes: status.progress_bytes,
            time_in_read_ms: status.time_in_read_ms,
            time_in_commit_ms: status.time_in_commit_ms,
        };
        Session {
            job,
            settings,
            state,
            metrics,
            cancel,
            status,
            threshold,
            baseline,
            rows_read: 0,
            rows_skipped: 0,
            started: Instant::now(),
            commit_time: Duration::ZERO,
            current: IngestPhase::ResolveCheckpoint,
        }
    }

    fn phase(&mut self, next: IngestPhase) {
        debug!(from = %self.current, to = %next, "Phase transition");
        self.current = next;
    }

    async fn drive(
        &mut self,
        source: &mut CsvRowSource,
        committer: Option<&BatchCommitter>,
    ) -> Result<(), IngestError> {
        self.phase(IngestPhase::Scanning);
        let mut batcher = PartitionBatcher::new(self.settings.max_batch_size);

        if let Some(committer) = committer {
            while let Some(row) = self.next_row(source).await? {
                self.record_read(source.current_byte_offset());

                match committer.prepare(&row)? {
                    Prepared::Skipped {
                        partition_key,
                        row_key,
                    } => {
                        self.record_skipped();
                        debug!(
                            row = row.index,
                            partition_key = %partition_key,
                            row_key = %row_key,
                            "Skipping row with illegal key"
                        );
                    }
                    Prepared::Op(op) => {
                        if let Some(batch) = batcher.add(op) {
                            self.apply(committer, batch).await?;
                        }
                    }
                }

                if self.rows_read % self.settings.checkpoint_interval == 0 {
                    self.checkpoint().await?;
                }
                if self.rows_read % self.settings.progress_log_interval == 0 {
                    info!(
                        rows_read = self.rows_read,
                        rows_committed = self.status.total_committed,
                        percent = self.status.percent_complete(),
                        "Upload progress"
                    );
                }
            }

            self.phase(IngestPhase::Draining);
            for batch in batcher.flush_all() {
                self.apply(committer, batch).await?;
            }
        } else {
            self.phase(IngestPhase::Draining);
        }

        self.phase(IngestPhase::Finalizing);
        self.status.progress_bytes = self.status.progress_bytes.max(source.current_byte_offset());
        self.status.completed = true;
        self.update_times();
        self.state.save_progress(self.job, &self.status).await?;
        Ok(())
    }

    /// Reads the next row, stopping first if shutdown was requested.
    async fn next_row(
        &mut self,
        source: &mut CsvRowSource,
    ) -> Result<Option<Row>, IngestError> {
        self.check_cancelled().await?;
        Ok(source.read_row()?)
    }

    async fn apply(&mut self, committer: &BatchCommitter, batch: Batch) -> Result<(), IngestError> {
        if batch.end() <= self.threshold {
            self.metrics.increment_replayed(1);
            debug!(
                partition_key = %batch.partition_key,
                start = batch.start,
                rows = batch.len(),
                "Batch already committed by an earlier session"
            );
            return Ok(());
        }

        self.check_cancelled().await?;
        let outcome = committer.commit(&batch).await?;
        self.commit_time += outcome.duration;
        self.status.commit_through(batch.end(), outcome.rows as u64);
        self.update_times();
        self.state.save_progress(self.job, &self.status).await?;
        Ok(())
    }

    fn record_read(&mut self, byte_offset: u64) {
        self.rows_read += 1;
        self.metrics.increment_read(1);
        self.status.total_read = self.baseline.total_read.max(self.rows_read);
        self.status.progress_bytes = self.baseline.progress_bytes.max(byte_offset);
    }

    fn record_skipped(&mut self) {
        self.rows_skipped += 1;
        self.metrics.increment_skipped(1);
        self.status.total_skipped = self.baseline.total_skipped.max(self.rows_skipped);
    }

    fn update_times(&mut self) {
        self.status.time_in_read_ms =
            self.baseline.time_in_read_ms + self.started.elapsed().as_millis() as u64;
        self.status.time_in_commit_ms =
            self.baseline.time_in_commit_ms + self.commit_time.as_millis() as u64;
    }

    async fn checkpoint(&mut self) -> Result<(), IngestError> {
        self.update_times();
        self.state.save_progress(self.job, &self.status).await?;
        info!(
            rows_read = self.status.total_read,
            rows_committed = self.status.total_committed,
            progress_bytes = self.status.progress_bytes,
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn check_cancelled(&mut self) -> Result<(), IngestError> {
        if !self.cancel.is_cancelled() {
            return Ok(());
        }
        warn!(phase = %self.current, "Shutdown requested, saving progress");
        self.update_times();
        self.state.save_progress(self.job, &self.status).await?;
        Err(IngestError::Cancelled {
            rows_read: self.status.total_read,
            rows_committed: self.status.total_committed,
        })
    }

    /// Saves what is known to be committed. The previous checkpoint stays if this fails.
    async fn save_after_failure(&mut self) {
        self.update_times();
        if let Err(e) = self.state.save_progress(self.job, &self.status).await {
            warn!(error = %e, "Could not save progress after failure");
        }
    }
}
