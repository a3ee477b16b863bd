use connectors::error::StoreError;
use model::execution::errors::JobSpecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to save checkpoint '{blob}': {source}")]
    SaveCheckpoint {
        blob: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to load checkpoint '{blob}': {source}")]
    LoadCheckpoint {
        blob: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete checkpoint '{blob}': {source}")]
    ClearCheckpoint {
        blob: String,
        #[source]
        source: StoreError,
    },

    #[error("Checkpoint '{blob}' is not a valid progress record: {reason}")]
    Corrupt { blob: String, reason: String },

    #[error("Job has no checkpoint location: {0}")]
    Location(#[from] JobSpecError),
}
