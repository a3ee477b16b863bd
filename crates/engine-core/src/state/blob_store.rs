use crate::{error::StateError, state::StateStore};
use async_trait::async_trait;
use connectors::{blob::BlobStore, error::StoreError};
use model::execution::{job::JobSpec, progress::ProgressStatus};
use std::sync::Arc;
use tracing::debug;

/// Keeps each job's checkpoint as a small JSON text blob beside its input.
#[derive(Clone)]
pub struct BlobStateStore {
    blobs: Arc<dyn BlobStore>,
}

impl BlobStateStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl StateStore for BlobStateStore {
    async fn save_progress(
        &self,
        job: &JobSpec,
        status: &ProgressStatus,
    ) -> Result<(), StateError> {
        let blob = job.checkpoint_ref()?;
        let text = serde_json::to_string_pretty(status).map_err(|e| StateError::SaveCheckpoint {
            blob: blob.to_string(),
            source: StoreError::from(e),
        })?;

        self.blobs
            .write_text(&blob, &text)
            .await
            .map_err(|source| StateError::SaveCheckpoint {
                blob: blob.to_string(),
                source,
            })?;

        debug!(
            checkpoint = %blob,
            total_read = status.total_read,
            total_committed = status.total_committed,
            "Saved checkpoint"
        );
        Ok(())
    }

    async fn load_progress(&self, job: &JobSpec) -> Result<Option<ProgressStatus>, StateError> {
        let blob = job.checkpoint_ref()?;
        let load_err = |source| StateError::LoadCheckpoint {
            blob: blob.to_string(),
            source,
        };

        let text = match self.blobs.read_text(&blob).await {
            Ok(text) => text,
            Err(StoreError::BlobNotFound(_)) => return Ok(None),
            Err(e) => return Err(load_err(e)),
        };

        let mut status: ProgressStatus =
            serde_json::from_str(&text).map_err(|e| StateError::Corrupt {
                blob: blob.to_string(),
                reason: e.to_string(),
            })?;

        status.last_modified = match self.blobs.properties(&blob).await {
            Ok(props) => props.last_modified,
            Err(StoreError::BlobNotFound(_)) => None,
            Err(e) => return Err(load_err(e)),
        };
        Ok(Some(status))
    }

    async fn clear_progress(&self, job: &JobSpec) -> Result<bool, StateError> {
        let blob = job.checkpoint_ref()?;
        self.blobs
            .delete(&blob)
            .await
            .map_err(|source| StateError::ClearCheckpoint {
                blob: blob.to_string(),
                source,
            })
    }
}
