use model::records::batch::{Batch, UpsertOp};
use std::collections::BTreeMap;

/// Groups operations by partition key into bounded batches.
///
/// One instance per run. Batches are emitted in a deterministic order for a
/// given sequence of operations, and each carries its offset in that order.
#[derive(Debug)]
pub struct PartitionBatcher {
    max_batch_size: usize,
    pending: BTreeMap<String, Vec<UpsertOp>>,
    emitted: u64,
}

impl PartitionBatcher {
    pub fn new(max_batch_size: usize) -> Self {
        PartitionBatcher {
            max_batch_size: max_batch_size.max(1),
            pending: BTreeMap::new(),
            emitted: 0,
        }
    }

    /// Adds `op` to its partition's batch and returns the batch once it is full.
    pub fn add(&mut self, op: UpsertOp) -> Option<Batch> {
        let partition_key = op.partition_key.clone();
        let ops = self.pending.entry(partition_key.clone()).or_default();
        ops.push(op);
        if ops.len() < self.max_batch_size {
            return None;
        }

        let ops = self.pending.remove(&partition_key)?;
        Some(self.emit(partition_key, ops))
    }

    /// Drains every partial batch in ascending partition key order.
    pub fn flush_all(&mut self) -> Vec<Batch> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter(|(_, ops)| !ops.is_empty())
            .map(|(partition_key, ops)| self.emit(partition_key, ops))
            .collect()
    }

    /// Operations accepted but not yet emitted.
    pub fn pending_ops(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn emit(&mut self, partition_key: String, ops: Vec<UpsertOp>) -> Batch {
        let start = self.emitted;
        self.emitted += ops.len() as u64;
        Batch {
            partition_key,
            ops,
            start,
        }
    }
}
