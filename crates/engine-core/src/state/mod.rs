use crate::error::StateError;
use async_trait::async_trait;
use model::execution::{job::JobSpec, progress::ProgressStatus};

pub mod blob_store;

/// Durable home of a job's `ProgressStatus`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Overwrites the job's checkpoint with `status`.
    async fn save_progress(&self, job: &JobSpec, status: &ProgressStatus)
    -> Result<(), StateError>;

    /// Reads the job's checkpoint, `None` when the job has never run.
    async fn load_progress(&self, job: &JobSpec) -> Result<Option<ProgressStatus>, StateError>;

    /// Removes the checkpoint. Returns whether one existed.
    async fn clear_progress(&self, job: &JobSpec) -> Result<bool, StateError>;
}
