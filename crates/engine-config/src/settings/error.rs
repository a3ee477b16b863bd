use thiserror::Error;

/// Errors raised when ingestion settings are out of range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Batches must hold at least one operation and fit the store's atomic batch limit.
    #[error("max_batch_size must be between 1 and {limit}, got {value}")]
    BatchSize { value: usize, limit: usize },

    #[error("checkpoint_interval must be greater than zero")]
    CheckpointInterval,

    #[error("progress_log_interval must be greater than zero")]
    ProgressLogInterval,

    /// The delimiter must be a single ASCII character other than a quote or line break.
    #[error("Unsupported delimiter {0:?}")]
    Delimiter(char),

    #[error("retry.max_attempts must be at least 1")]
    RetryAttempts,

    #[error("retry.max_delay_ms ({max}) is below retry.base_delay_ms ({base})")]
    RetryDelay { base: u64, max: u64 },
}
