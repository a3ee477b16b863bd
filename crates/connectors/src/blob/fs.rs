use crate::{
    blob::{BlobProperties, BlobStore, fingerprint::fingerprint_file},
    error::StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::core::identifiers::BlobRef;
use std::{
    io::{self, BufReader, ErrorKind, Read},
    path::{Component, Path, PathBuf},
};
use tracing::debug;

const READ_BUFFER: usize = 64 * 1024;

/// Blob store backed by a directory: one subdirectory per container.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, blob: &BlobRef) -> Result<PathBuf, StoreError> {
        check_segment(&blob.container)?;
        check_segment(&blob.name)?;
        Ok(self.root.join(&blob.container).join(&blob.name))
    }

    fn not_found(blob: &BlobRef, err: io::Error) -> StoreError {
        if err.kind() == ErrorKind::NotFound {
            StoreError::BlobNotFound(blob.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}

/// Rejects names that would escape the store root.
fn check_segment(name: &str) -> Result<(), StoreError> {
    let path = Path::new(name);
    let escapes = name.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(StoreError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid blob path segment '{name}'"),
        )));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn open(&self, blob: &BlobRef) -> Result<Box<dyn Read + Send>, StoreError> {
        let path = self.path_of(blob)?;
        let file = std::fs::File::open(&path).map_err(|e| Self::not_found(blob, e))?;
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER, file)))
    }

    async fn properties(&self, blob: &BlobRef) -> Result<BlobProperties, StoreError> {
        let path = self.path_of(blob)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Self::not_found(blob, e))?;
        let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);

        let fingerprint = tokio::task::spawn_blocking(move || fingerprint_file(&path))
            .await?
            .map_err(|e| Self::not_found(blob, e))?;

        Ok(BlobProperties {
            length: meta.len(),
            fingerprint,
            last_modified,
        })
    }

    async fn exists(&self, blob: &BlobRef) -> Result<bool, StoreError> {
        let path = self.path_of(blob)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn write_text(&self, blob: &BlobRef, text: &str) -> Result<(), StoreError> {
        let path = self.path_of(blob)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so readers never observe a half-written checkpoint.
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, text.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_text(&self, blob: &BlobRef) -> Result<String, StoreError> {
        let path = self.path_of(blob)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::not_found(blob, e))
    }

    async fn delete(&self, blob: &BlobRef) -> Result<bool, StoreError> {
        let path = self.path_of(blob)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn upload_file(&self, blob: &BlobRef, source: &Path) -> Result<u64, StoreError> {
        let path = self.path_of(blob)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(source, &path).await?;
        debug!(blob = %blob, bytes, "Uploaded local file to blob store");
        Ok(bytes)
    }
}
