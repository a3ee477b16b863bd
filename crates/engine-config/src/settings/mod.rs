use crate::settings::error::SettingsError;
use connectors::{file::csv::source::CsvOptions, table::MAX_BATCH_OPERATIONS};
use engine_core::retry::RetryPolicy;
use model::core::value::ValueMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 5_000;
pub const DEFAULT_PROGRESS_LOG_INTERVAL: u64 = 100_000;

/// Tunables for one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Upper bound on operations per partition batch.
    pub max_batch_size: usize,
    /// Rows between periodic checkpoint writes while scanning.
    pub checkpoint_interval: u64,
    /// Rows between progress log lines.
    pub progress_log_interval: u64,
    pub value_mode: ValueMode,
    pub delimiter: char,
    pub retry: RetrySettings,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            progress_log_interval: DEFAULT_PROGRESS_LOG_INTERVAL,
            value_mode: ValueMode::default(),
            delimiter: ',',
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
        }
    }
}

impl IngestSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=MAX_BATCH_OPERATIONS).contains(&self.max_batch_size) {
            return Err(SettingsError::BatchSize {
                value: self.max_batch_size,
                limit: MAX_BATCH_OPERATIONS,
            });
        }
        if self.checkpoint_interval == 0 {
            return Err(SettingsError::CheckpointInterval);
        }
        if self.progress_log_interval == 0 {
            return Err(SettingsError::ProgressLogInterval);
        }
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(SettingsError::Delimiter(self.delimiter));
        }
        self.retry.validate()
    }

    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter as u8,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_attempts == 0 {
            return Err(SettingsError::RetryAttempts);
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(SettingsError::RetryDelay {
                base: self.base_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
        )
    }
}
