use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column name -> value, ordered so serialized entities are stable.
pub type Properties = BTreeMap<String, Value>;

/// An idempotent insert-or-replace of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertOp {
    pub partition_key: String,
    pub row_key: String,
    pub properties: Properties,
}

impl UpsertOp {
    pub fn new(partition_key: String, row_key: String, properties: Properties) -> Self {
        UpsertOp {
            partition_key,
            row_key,
            properties,
        }
    }

    pub fn into_entity(self) -> Entity {
        Entity {
            partition_key: self.partition_key,
            row_key: self.row_key,
            properties: self.properties,
        }
    }
}

/// A row as it lives in the table store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub partition_key: String,
    pub row_key: String,
    pub properties: Properties,
}

/// A same-partition group of operations, committed or discarded as a unit.
#[derive(Debug, Clone)]
pub struct Batch {
    pub partition_key: String,
    pub ops: Vec<UpsertOp>,
    /// Number of operations flushed before this batch in the current run.
    /// The flush sequence is deterministic for a given input, so `start`
    /// identifies the batch across sessions.
    pub start: u64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Position one past the last operation of this batch.
    pub fn end(&self) -> u64 {
        self.start + self.ops.len() as u64
    }
}
