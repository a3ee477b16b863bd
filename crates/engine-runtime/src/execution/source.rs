use crate::error::IngestError;
use connectors::{
    blob::{BlobStore, fingerprint::fingerprint_file},
    error::StoreError,
    file::{csv::error::FileError, open_local},
};
use model::execution::job::{InputLocation, JobSpec};
use std::io::Read;
use tracing::debug;

/// A readable input plus what the engine needs to know about it up front.
pub struct OpenedInput {
    pub reader: Box<dyn Read + Send>,
    pub length: u64,
    /// Change-detection token; `None` when it was not requested.
    pub fingerprint: Option<String>,
}

/// Opens the job's input, local file or blob.
pub async fn open_input(
    job: &JobSpec,
    blobs: &dyn BlobStore,
    with_fingerprint: bool,
) -> Result<OpenedInput, IngestError> {
    match &job.input {
        InputLocation::File { path } => {
            let (reader, length) = open_local(path)?;
            let fingerprint = if with_fingerprint {
                let path = path.clone();
                let fp = tokio::task::spawn_blocking(move || fingerprint_file(&path))
                    .await?
                    .map_err(FileError::from)?;
                Some(fp)
            } else {
                None
            };
            debug!(path = %path.display(), length, "Opened local input");
            Ok(OpenedInput {
                reader,
                length,
                fingerprint,
            })
        }
        InputLocation::Blob(blob) => {
            let props = blobs.properties(blob).await.map_err(unavailable)?;
            let reader = blobs.open(blob).await.map_err(unavailable)?;
            debug!(blob = %blob, length = props.length, "Opened blob input");
            Ok(OpenedInput {
                reader,
                length: props.length,
                fingerprint: with_fingerprint.then_some(props.fingerprint),
            })
        }
    }
}

fn unavailable(err: StoreError) -> IngestError {
    match err {
        StoreError::BlobNotFound(name) => {
            FileError::SourceUnavailable(format!("blob {name} does not exist")).into()
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::blob::fs::FsBlobStore;
    use model::core::identifiers::BlobRef;
    use tempfile::tempdir;

    fn job(input: InputLocation) -> JobSpec {
        JobSpec {
            account: "dev".into(),
            table: "orders".into(),
            partition_key: "p".into(),
            row_key: "r".into(),
            input,
            container: Some("uploads".into()),
        }
    }

    #[tokio::test]
    async fn local_and_blob_copies_share_a_fingerprint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "p,r\na,1\n").unwrap();
        let blobs = FsBlobStore::new(dir.path().join("blobs"));
        let blob = BlobRef::new("uploads", "orders.csv");
        blobs.upload_file(&blob, &path).await.unwrap();

        let local = open_input(&job(InputLocation::File { path }), &blobs, true)
            .await
            .unwrap();
        let remote = open_input(&job(InputLocation::Blob(blob)), &blobs, true)
            .await
            .unwrap();
        assert_eq!(local.length, 8);
        assert_eq!(local.length, remote.length);
        assert_eq!(local.fingerprint, remote.fingerprint);
    }

    #[tokio::test]
    async fn missing_inputs_are_unavailable() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());

        let err = open_input(
            &job(InputLocation::Blob(BlobRef::new("uploads", "nope.csv"))),
            &blobs,
            true,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(
            err,
            IngestError::Input(FileError::SourceUnavailable(_))
        ));

        let err = open_input(
            &job(InputLocation::File {
                path: dir.path().join("nope.csv"),
            }),
            &blobs,
            false,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, IngestError::Input(FileError::NotFound(_))));
    }
}
