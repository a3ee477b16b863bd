use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::core::identifiers::BlobRef;
use std::{io::Read, path::Path};

pub mod fingerprint;
pub mod fs;

/// Metadata the engine reads about a blob without downloading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub length: u64,
    /// Opaque change-detection token; differs whenever the content differs.
    pub fingerprint: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Blob-like byte store holding input files and checkpoint text blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Opens the blob for sequential reading.
    async fn open(&self, blob: &BlobRef) -> Result<Box<dyn Read + Send>, StoreError>;

    async fn properties(&self, blob: &BlobRef) -> Result<BlobProperties, StoreError>;

    async fn exists(&self, blob: &BlobRef) -> Result<bool, StoreError>;

    /// Writes `text`, replacing any previous content.
    async fn write_text(&self, blob: &BlobRef, text: &str) -> Result<(), StoreError>;

    async fn read_text(&self, blob: &BlobRef) -> Result<String, StoreError>;

    /// Deletes the blob. Returns whether it existed.
    async fn delete(&self, blob: &BlobRef) -> Result<bool, StoreError>;

    /// Copies a local file into the store, creating the container when needed.
    async fn upload_file(&self, blob: &BlobRef, path: &Path) -> Result<u64, StoreError>;

    async fn length(&self, blob: &BlobRef) -> Result<u64, StoreError> {
        Ok(self.properties(blob).await?.length)
    }

    async fn fingerprint(&self, blob: &BlobRef) -> Result<String, StoreError> {
        Ok(self.properties(blob).await?.fingerprint)
    }
}
