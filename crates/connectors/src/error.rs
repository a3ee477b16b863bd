use std::io::ErrorKind;
use thiserror::Error;

/// Errors raised by the blob, table and queue collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The store did not answer in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The store asked the client to back off.
    #[error("Request throttled by the store: {0}")]
    Throttled(String),

    #[error("Transient network failure: {0}")]
    Network(String),

    #[error("Batch for partition '{partition_key}' has {size} operations, store limit is {limit}")]
    BatchTooLarge {
        partition_key: String,
        size: usize,
        limit: usize,
    },

    #[error("Batch for partition '{expected}' contains an operation for partition '{found}'")]
    MixedPartition { expected: String, found: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout(_) | StoreError::Throttled(_) | StoreError::Network(_) => true,
            StoreError::Io(err) => matches!(
                err.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::Interrupted
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            StoreError::BlobNotFound(_)
            | StoreError::TableNotFound(_)
            | StoreError::BatchTooLarge { .. }
            | StoreError::MixedPartition { .. }
            | StoreError::Serialization(_)
            | StoreError::Sled(_)
            | StoreError::TaskJoin(_) => false,
        }
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_errors() {
        assert!(StoreError::Throttled("503".into()).is_transient());
        assert!(StoreError::Timeout("30s".into()).is_transient());
        assert!(StoreError::Io(std::io::Error::from(ErrorKind::ConnectionReset)).is_transient());

        assert!(!StoreError::TableNotFound("orders".into()).is_transient());
        assert!(!StoreError::Io(std::io::Error::from(ErrorKind::PermissionDenied)).is_transient());
        assert!(
            !StoreError::BatchTooLarge {
                partition_key: "p".into(),
                size: 101,
                limit: 100
            }
            .is_transient()
        );
    }
}
