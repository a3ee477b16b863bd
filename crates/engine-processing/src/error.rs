use connectors::{error::StoreError, file::csv::error::FileError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Can't find column named '{0}'")]
    ColumnNotFound(String),

    #[error("Row {row} has no value for key column '{column}'")]
    MissingKeyField { row: u64, column: String },

    #[error("Failed to read input: {0}")]
    Source(#[from] FileError),

    #[error("Failed to commit batch for partition '{partition_key}' ({rows} rows): {source}")]
    Commit {
        partition_key: String,
        rows: usize,
        #[source]
        source: StoreError,
    },

    #[error("Retry attempts exhausted after {attempts} tries for partition '{partition_key}': {source}")]
    RetriesExhausted {
        partition_key: String,
        attempts: usize,
        #[source]
        source: StoreError,
    },

    #[error("Table store error: {0}")]
    Store(#[from] StoreError),
}
