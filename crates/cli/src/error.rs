use connectors::error::StoreError;
use engine_runtime::error::IngestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    ConfigDeserialize(#[from] serde_json::Error),

    #[error("Config file {0} does not exist")]
    ConfigMissing(String),

    #[error("Unknown account '{0}'; add it to the accounts section of the config file")]
    UnknownAccount(String),

    #[error("Missing {0}; pass it as a flag or in the --job file")]
    MissingArgument(&'static str),

    #[error("Cannot open store: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
