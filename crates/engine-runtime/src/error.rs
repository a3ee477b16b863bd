use connectors::{error::StoreError, file::csv::error::FileError};
use engine_config::settings::error::SettingsError;
use engine_core::error::StateError;
use engine_processing::error::ConsumerError;
use model::execution::errors::JobSpecError;
use thiserror::Error;

/// Top-level errors for the ingestion engine.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The job spec is incomplete or inconsistent.
    #[error("Invalid job: {0}")]
    InvalidJob(#[from] JobSpecError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The input could not be opened or decoded.
    #[error("Input error: {0}")]
    Input(#[from] FileError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Checkpoint error: {0}")]
    State(#[from] StateError),

    #[error("{0}")]
    Consumer(#[from] ConsumerError),

    /// The run stopped part way; the last saved checkpoint is a valid resume point.
    #[error("Upload failed after reading {rows_read} rows and committing {rows_committed}: {source}")]
    RunFailed {
        rows_read: u64,
        rows_committed: u64,
        #[source]
        source: Box<IngestError>,
    },

    /// Shutdown was requested; progress was saved before returning.
    #[error("Upload cancelled after reading {rows_read} rows and committing {rows_committed}")]
    Cancelled { rows_read: u64, rows_committed: u64 },

    /// An error occurred while joining a task.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IngestError::Cancelled { .. })
    }
}
