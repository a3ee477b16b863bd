use crate::error::StoreError;
use async_trait::async_trait;

pub mod fs;

/// Queue used to hand a job to a remote worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueues a text payload and returns the message id.
    async fn enqueue(&self, payload: &str) -> Result<String, StoreError>;

    /// Human-readable queue name for log and console output.
    fn name(&self) -> &str;
}
