#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{error::StoreError, table::TableStore};
use engine_core::{error::StateError, state::StateStore};
use model::{
    execution::{job::JobSpec, progress::ProgressStatus},
    records::batch::{Entity, UpsertOp},
};
use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio_util::sync::CancellationToken;

/// Table store wrapper that injects failures and counts calls.
pub struct FlakyTableStore {
    inner: Arc<dyn TableStore>,
    /// Successful commits allowed before every further commit fails permanently.
    fail_after: Option<usize>,
    /// Commit attempts left that fail with a throttling error.
    transient_left: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
    pub commits: AtomicUsize,
    pub attempts: AtomicUsize,
    pub ensure_calls: AtomicUsize,
    /// Largest number of operations seen in one commit.
    pub largest_batch: AtomicUsize,
    /// Set when a commit carried an operation outside its partition.
    pub mixed_partitions: AtomicBool,
}

impl FlakyTableStore {
    pub fn new(inner: Arc<dyn TableStore>) -> Self {
        Self {
            inner,
            fail_after: None,
            transient_left: AtomicUsize::new(0),
            cancel_after: None,
            commits: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            ensure_calls: AtomicUsize::new(0),
            largest_batch: AtomicUsize::new(0),
            mixed_partitions: AtomicBool::new(false),
        }
    }

    pub fn fail_after(mut self, commits: usize) -> Self {
        self.fail_after = Some(commits);
        self
    }

    pub fn transient_failures(self, count: usize) -> Self {
        self.transient_left.store(count, Ordering::SeqCst);
        self
    }

    /// Cancels `token` right after the `commits`-th successful commit.
    pub fn cancel_after(mut self, commits: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((commits, token));
        self
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    pub fn largest_batch(&self) -> usize {
        self.largest_batch.load(Ordering::SeqCst)
    }

    pub fn mixed_partitions(&self) -> bool {
        self.mixed_partitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableStore for FlakyTableStore {
    async fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.ensure_table(table).await
    }

    async fn commit_batch(
        &self,
        table: &str,
        partition_key: &str,
        ops: &[UpsertOp],
    ) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.largest_batch.fetch_max(ops.len(), Ordering::SeqCst);
        if ops.iter().any(|op| op.partition_key != partition_key) {
            self.mixed_partitions.store(true, Ordering::SeqCst);
        }

        let throttled = self
            .transient_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return Err(StoreError::Throttled("injected throttling".into()));
        }

        if let Some(limit) = self.fail_after
            && self.commits() >= limit
        {
            return Err(StoreError::Io(io::Error::other("injected failure")));
        }

        self.inner.commit_batch(table, partition_key, ops).await?;
        let done = self.commits.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((limit, token)) = &self.cancel_after
            && done == *limit
        {
            token.cancel();
        }
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        self.inner.get(table, partition_key, row_key).await
    }

    async fn scan(&self, table: &str) -> Result<Vec<Entity>, StoreError> {
        self.inner.scan(table).await
    }
}

/// State store wrapper counting checkpoint writes and keeping every saved snapshot.
pub struct CountingStateStore {
    inner: Arc<dyn StateStore>,
    cancel_after: Option<(usize, CancellationToken)>,
    snapshots: Mutex<Vec<ProgressStatus>>,
    pub saves: AtomicUsize,
}

impl CountingStateStore {
    pub fn new(inner: Arc<dyn StateStore>) -> Self {
        Self {
            inner,
            cancel_after: None,
            snapshots: Mutex::new(Vec::new()),
            saves: AtomicUsize::new(0),
        }
    }

    /// Cancels `token` right after the `saves`-th checkpoint write.
    pub fn cancel_after(mut self, saves: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((saves, token));
        self
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshots(&self) -> Vec<ProgressStatus> {
        self.snapshots.lock().expect("snapshot lock").clone()
    }
}

#[async_trait]
impl StateStore for CountingStateStore {
    async fn save_progress(
        &self,
        job: &JobSpec,
        status: &ProgressStatus,
    ) -> Result<(), StateError> {
        self.inner.save_progress(job, status).await?;
        self.snapshots
            .lock()
            .expect("snapshot lock")
            .push(status.clone());
        let done = self.saves.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((limit, token)) = &self.cancel_after
            && done == *limit
        {
            token.cancel();
        }
        Ok(())
    }

    async fn load_progress(&self, job: &JobSpec) -> Result<Option<ProgressStatus>, StateError> {
        self.inner.load_progress(job).await
    }

    async fn clear_progress(&self, job: &JobSpec) -> Result<bool, StateError> {
        self.inner.clear_progress(job).await
    }
}
