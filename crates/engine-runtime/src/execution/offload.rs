use crate::error::IngestError;
use connectors::{
    blob::BlobStore, error::StoreError, file::csv::error::FileError, queue::JobQueue,
};
use model::{
    core::identifiers::BlobRef,
    execution::{
        errors::JobSpecError,
        job::{InputLocation, JobSpec},
    },
};
use tracing::info;

/// Result of handing a job to the queue.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub message_id: String,
    pub queue: String,
    /// The job as enqueued; its input always points at a blob.
    pub job: JobSpec,
    /// Bytes copied into the blob store, `None` when the blob was already there.
    pub uploaded_bytes: Option<u64>,
}

/// Copies a local input into the blob store if needed and enqueues the job.
pub async fn queue_job(
    job: &JobSpec,
    blobs: &dyn BlobStore,
    queue: &dyn JobQueue,
) -> Result<QueuedJob, IngestError> {
    job.validate()?;

    let (remote_job, uploaded_bytes) = match &job.input {
        InputLocation::File { path } => {
            let container = job.container().ok_or(JobSpecError::MissingContainer)?;
            let blob = BlobRef::new(container, job.input_blob_name());
            let uploaded = if blobs.exists(&blob).await? {
                info!(blob = %blob, "Input already in the blob store, not uploading");
                None
            } else {
                info!(blob = %blob, path = %path.display(), "Uploading input to the blob store");
                let bytes = blobs.upload_file(&blob, path).await?;
                info!(blob = %blob, bytes, "Input upload finished");
                Some(bytes)
            };
            (job.with_blob_input(blob), uploaded)
        }
        InputLocation::Blob(blob) => {
            if !blobs.exists(blob).await? {
                return Err(
                    FileError::SourceUnavailable(format!("blob {blob} does not exist")).into(),
                );
            }
            (job.clone(), None)
        }
    };

    let payload = serde_json::to_string(&remote_job).map_err(StoreError::from)?;
    let message_id = queue.enqueue(&payload).await?;
    info!(queue = queue.name(), message_id = %message_id, "Job queued");

    Ok(QueuedJob {
        message_id,
        queue: queue.name().to_string(),
        job: remote_job,
        uploaded_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{blob::fs::FsBlobStore, queue::fs::FsJobQueue};
    use tempfile::tempdir;

    fn local_job(path: std::path::PathBuf) -> JobSpec {
        JobSpec {
            account: "dev".into(),
            table: "orders".into(),
            partition_key: "region".into(),
            row_key: "id".into(),
            input: InputLocation::File { path },
            container: Some("uploads".into()),
        }
    }

    #[tokio::test]
    async fn local_input_is_uploaded_once_and_job_points_at_blob() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "region,id\neu,1\n").unwrap();
        let blobs = FsBlobStore::new(dir.path().join("blobs"));
        let queue = FsJobQueue::new(dir.path().join("jobs"));

        let first = queue_job(&local_job(path.clone()), &blobs, &queue)
            .await
            .unwrap();
        assert_eq!(first.uploaded_bytes, Some(15));
        assert_eq!(
            first.job.input,
            InputLocation::Blob(BlobRef::new("uploads", "orders.csv"))
        );

        let second = queue_job(&local_job(path), &blobs, &queue).await.unwrap();
        assert_eq!(second.uploaded_bytes, None);

        let pending = queue.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        let enqueued: JobSpec = serde_json::from_str(&pending[0]).unwrap();
        assert_eq!(enqueued, first.job);
    }

    #[tokio::test]
    async fn missing_blob_input_is_not_queued() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path().join("blobs"));
        let queue = FsJobQueue::new(dir.path().join("jobs"));
        let mut job = local_job(dir.path().join("unused.csv"));
        job.input = InputLocation::Blob(BlobRef::new("uploads", "absent.csv"));

        let err = queue_job(&job, &blobs, &queue).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Input(FileError::SourceUnavailable(_))
        ));
        assert!(queue.pending().await.unwrap().is_empty());
    }
}
