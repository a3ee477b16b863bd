use crate::report::finding::{Finding, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Findings kept in a report; counts keep growing past this.
pub const MAX_SAMPLE_FINDINGS: usize = 10;

/// The overall status of the validation run.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ValidationStatus {
    #[default]
    Success,
    SuccessWithWarnings,
    Failure,
}

/// Outcome of a read-only pass over an input.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ValidationReport {
    pub run_id: String,
    pub engine_version: String,
    pub timestamp: DateTime<Utc>,
    pub status: ValidationStatus,

    pub total_rows: u64,
    pub distinct_partitions: u64,
    pub avg_rows_per_partition: f64,
    pub illegal_keys: u64,
    pub duplicates: u64,

    pub bytes_scanned: u64,
    pub elapsed_ms: u64,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new() -> Self {
        ValidationReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Keeps the first few findings as samples.
    pub fn add_finding(&mut self, finding: Finding) {
        if self.findings.len() < MAX_SAMPLE_FINDINGS {
            self.findings.push(finding);
        }
    }

    /// Computes derived figures once the pass is over.
    pub fn finish(&mut self, distinct_partitions: u64, bytes_scanned: u64, elapsed_ms: u64) {
        self.distinct_partitions = distinct_partitions;
        self.bytes_scanned = bytes_scanned;
        self.elapsed_ms = elapsed_ms;
        self.avg_rows_per_partition = if distinct_partitions == 0 {
            0.0
        } else {
            self.total_rows as f64 / distinct_partitions as f64
        };

        self.status = if self.findings.iter().any(|f| f.severity == Severity::Error) {
            ValidationStatus::Failure
        } else if self.illegal_keys > 0 || self.duplicates > 0 {
            ValidationStatus::SuccessWithWarnings
        } else {
            ValidationStatus::Success
        };
    }

    pub fn is_clean(&self) -> bool {
        self.status == ValidationStatus::Success
    }
}
