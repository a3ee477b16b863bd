use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Input source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: u64, reason: String },
    #[error("Invalid CSV header: {0}")]
    InvalidHeader(String),
}
