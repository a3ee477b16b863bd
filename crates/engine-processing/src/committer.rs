use crate::{
    error::ConsumerError,
    keys::{KeyResolver, has_illegal_chars},
    retry::classify_store_error,
};
use connectors::table::TableStore;
use engine_core::{
    metrics::Metrics,
    retry::{RetryError, RetryPolicy},
};
use model::{
    core::value::{Value, ValueMode},
    records::{
        batch::{Batch, Properties, UpsertOp},
        row::Row,
    },
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};
use tracing::{debug, error};

/// What a row turns into before batching.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Op(UpsertOp),
    /// The row's keys carry a character the store rejects; it is counted, never written.
    Skipped {
        partition_key: String,
        row_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub rows: usize,
    pub attempts: usize,
    pub duration: Duration,
}

/// Turns rows into upserts and writes partition batches atomically, with retry.
pub struct BatchCommitter {
    tables: Arc<dyn TableStore>,
    table: String,
    columns: Vec<String>,
    keys: KeyResolver,
    value_mode: ValueMode,
    retry: RetryPolicy,
    metrics: Metrics,
}

impl BatchCommitter {
    pub fn new(
        tables: Arc<dyn TableStore>,
        table: impl Into<String>,
        columns: Vec<String>,
        keys: KeyResolver,
        value_mode: ValueMode,
        retry: RetryPolicy,
        metrics: Metrics,
    ) -> Self {
        Self {
            tables,
            table: table.into(),
            columns,
            keys,
            value_mode,
            retry,
            metrics,
        }
    }

    /// Builds the upsert for `row`. Every column becomes a property; key columns stay strings.
    pub fn prepare(&self, row: &Row) -> Result<Prepared, ConsumerError> {
        let (partition_key, row_key) = self.keys.extract(row)?;
        if has_illegal_chars(partition_key) || has_illegal_chars(row_key) {
            return Ok(Prepared::Skipped {
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
            });
        }

        let mut properties = Properties::new();
        for (idx, (name, cell)) in self.columns.iter().zip(&row.values).enumerate() {
            let value = if self.keys.is_key_column(idx) {
                Value::String(cell.clone())
            } else {
                Value::from_cell(cell, self.value_mode)
            };
            properties.insert(name.clone(), value);
        }

        Ok(Prepared::Op(UpsertOp::new(
            partition_key.to_string(),
            row_key.to_string(),
            properties,
        )))
    }

    /// Commits `batch` as one all-or-nothing write.
    ///
    /// Transient store failures retry the whole batch; the operations are
    /// idempotent upserts, so a retry after an ambiguous failure is safe.
    pub async fn commit(&self, batch: &Batch) -> Result<CommitOutcome, ConsumerError> {
        let start = Instant::now();
        if batch.is_empty() {
            return Ok(CommitOutcome {
                rows: 0,
                attempts: 0,
                duration: start.elapsed(),
            });
        }

        let tries = AtomicUsize::new(0);
        let result = self
            .retry
            .run(
                || {
                    tries.fetch_add(1, Ordering::Relaxed);
                    let tables = Arc::clone(&self.tables);
                    let table = self.table.as_str();
                    async move {
                        tables
                            .commit_batch(table, &batch.partition_key, &batch.ops)
                            .await
                    }
                },
                classify_store_error,
            )
            .await;

        let attempts = tries.into_inner();
        if attempts > 1 {
            self.metrics.increment_retries((attempts - 1) as u64);
        }

        match result {
            Ok(()) => {
                let duration = start.elapsed();
                self.metrics.record_commit(batch.len() as u64);
                debug!(
                    partition_key = %batch.partition_key,
                    rows = batch.len(),
                    start = batch.start,
                    attempts,
                    duration_ms = duration.as_millis() as u64,
                    "Batch committed"
                );
                Ok(CommitOutcome {
                    rows: batch.len(),
                    attempts,
                    duration,
                })
            }
            Err(err) => {
                self.metrics.increment_failures(1);
                error!(
                    partition_key = %batch.partition_key,
                    rows = batch.len(),
                    error = %err,
                    "Failed to commit batch"
                );
                Err(match err {
                    RetryError::Fatal(source) => ConsumerError::Commit {
                        partition_key: batch.partition_key.clone(),
                        rows: batch.len(),
                        source,
                    },
                    RetryError::AttemptsExceeded { attempts, last } => {
                        ConsumerError::RetriesExhausted {
                            partition_key: batch.partition_key.clone(),
                            attempts,
                            source: last,
                        }
                    }
                })
            }
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}
