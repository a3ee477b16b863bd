use crate::{
    error::StoreError,
    table::{MAX_BATCH_OPERATIONS, TableStore, check_batch},
};
use async_trait::async_trait;
use model::records::batch::{Entity, UpsertOp};
use sled::transaction::TransactionError;
use std::path::Path;
use tracing::debug;

/// Table store on top of sled: one tree per table, one key per (partition, row).
pub struct SledTableStore {
    db: sled::Db,
    max_batch: usize,
}

impl SledTableStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            max_batch: MAX_BATCH_OPERATIONS,
        })
    }

    #[inline]
    fn tree_name(table: &str) -> String {
        format!("table:{table}")
    }

    #[inline]
    fn entity_key(partition_key: &str, row_key: &str) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(&(partition_key, row_key))?)
    }

    fn existing_tree(&self, table: &str) -> Result<sled::Tree, StoreError> {
        let name = Self::tree_name(table);
        let exists = self
            .db
            .tree_names()
            .iter()
            .any(|n| n.as_ref() == name.as_bytes());
        if !exists {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        Ok(self.db.open_tree(name)?)
    }
}

#[async_trait]
impl TableStore for SledTableStore {
    async fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        self.db.open_tree(Self::tree_name(table))?;
        Ok(())
    }

    async fn commit_batch(
        &self,
        table: &str,
        partition_key: &str,
        ops: &[UpsertOp],
    ) -> Result<(), StoreError> {
        check_batch(partition_key, ops, self.max_batch)?;
        let tree = self.existing_tree(table)?;

        // Encode up front; the transaction closure may run more than once.
        let mut encoded = Vec::with_capacity(ops.len());
        for op in ops {
            let key = Self::entity_key(&op.partition_key, &op.row_key)?;
            let value = bincode::serialize(&op.clone().into_entity())?;
            encoded.push((key, value));
        }

        let result = tree.transaction::<_, _, ()>(|tx| {
            for (key, value) in &encoded {
                tx.insert(key.as_slice(), value.as_slice())?;
            }
            Ok(())
        });

        match result {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
            Err(TransactionError::Abort(())) => {
                return Err(StoreError::Serialization(
                    "batch transaction aborted".to_string(),
                ));
            }
        }

        tree.flush_async().await?;
        debug!(table, partition_key, rows = ops.len(), "Committed batch");
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        let tree = self.existing_tree(table)?;
        let key = Self::entity_key(partition_key, row_key)?;
        match tree.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<Entity>, StoreError> {
        let tree = self.existing_tree(table)?;
        let mut entities = Vec::new();
        for item in tree.iter() {
            let (_key, value) = item?;
            entities.push(bincode::deserialize(&value)?);
        }
        Ok(entities)
    }
}
