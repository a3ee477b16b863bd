use crate::error::StoreError;
use async_trait::async_trait;
use model::records::batch::{Entity, UpsertOp};

pub mod sled_store;

/// Largest number of operations a single atomic batch may carry.
pub const MAX_BATCH_OPERATIONS: usize = 100;

/// Partitioned key-value table store.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Creates the table when it does not exist yet.
    async fn ensure_table(&self, table: &str) -> Result<(), StoreError>;

    /// Applies every operation or none of them.
    ///
    /// Each operation is an insert-or-replace keyed by (partition key, row key),
    /// so committing the same batch twice leaves the table unchanged.
    async fn commit_batch(
        &self,
        table: &str,
        partition_key: &str,
        ops: &[UpsertOp],
    ) -> Result<(), StoreError>;

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Entity>, StoreError>;

    /// Reads the whole table. Intended for inspection and tests.
    async fn scan(&self, table: &str) -> Result<Vec<Entity>, StoreError>;
}

/// Checks the invariants every store enforces on an atomic batch.
pub fn check_batch(partition_key: &str, ops: &[UpsertOp], limit: usize) -> Result<(), StoreError> {
    if ops.len() > limit {
        return Err(StoreError::BatchTooLarge {
            partition_key: partition_key.to_string(),
            size: ops.len(),
            limit,
        });
    }
    if let Some(op) = ops.iter().find(|op| op.partition_key != partition_key) {
        return Err(StoreError::MixedPartition {
            expected: partition_key.to_string(),
            found: op.partition_key.clone(),
        });
    }
    Ok(())
}
