use crate::{
    core::identifiers::{BlobRef, file_stem},
    execution::errors::JobSpecError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix appended to the input's basename to name its checkpoint blob.
pub const CHECKPOINT_SUFFIX: &str = "-info.txt";

/// Where the delimited input is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputLocation {
    File { path: PathBuf },
    Blob(BlobRef),
}

/// Immutable description of one upload job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Account that owns the target table and the blobs.
    pub account: String,
    pub table: String,
    pub partition_key: String,
    pub row_key: String,
    pub input: InputLocation,
    /// Container for the checkpoint blob and, when offloading, the uploaded input.
    /// Defaults to the input blob's container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl JobSpec {
    pub fn validate(&self) -> Result<(), JobSpecError> {
        if self.account.trim().is_empty() {
            return Err(JobSpecError::EmptyField("account"));
        }
        if self.partition_key.trim().is_empty() {
            return Err(JobSpecError::EmptyField("partition_key"));
        }
        if self.row_key.trim().is_empty() {
            return Err(JobSpecError::EmptyField("row_key"));
        }
        if !is_valid_table_name(&self.table) {
            return Err(JobSpecError::InvalidTableName(self.table.clone()));
        }
        self.checkpoint_ref().map(|_| ())
    }

    pub fn container(&self) -> Option<&str> {
        match (&self.container, &self.input) {
            (Some(c), _) => Some(c.as_str()),
            (None, InputLocation::Blob(blob)) => Some(blob.container.as_str()),
            (None, InputLocation::File { .. }) => None,
        }
    }

    /// Blob holding this job's `ProgressStatus`, e.g. `orders.csv` -> `orders-info.txt`.
    pub fn checkpoint_ref(&self) -> Result<BlobRef, JobSpecError> {
        let container = self.container().ok_or(JobSpecError::MissingContainer)?;
        let name = format!("{}{CHECKPOINT_SUFFIX}", self.input_stem());
        Ok(BlobRef::new(container, name))
    }

    /// Name the input carries in the blob store, whether or not it lives there yet.
    pub fn input_blob_name(&self) -> String {
        match &self.input {
            InputLocation::Blob(blob) => blob.name.clone(),
            InputLocation::File { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.input {
            InputLocation::File { path } => Some(path),
            InputLocation::Blob(_) => None,
        }
    }

    fn input_stem(&self) -> String {
        match &self.input {
            InputLocation::Blob(blob) => blob.stem().to_string(),
            InputLocation::File { path } => {
                file_stem(path.to_string_lossy().as_ref()).to_string()
            }
        }
    }

    /// Returns a copy that reads its input from `blob` instead of the local file.
    pub fn with_blob_input(&self, blob: BlobRef) -> Self {
        JobSpec {
            input: InputLocation::Blob(blob),
            ..self.clone()
        }
    }
}

fn is_valid_table_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(input: InputLocation, container: Option<&str>) -> JobSpec {
        JobSpec {
            account: "devstore".into(),
            table: "orders".into(),
            partition_key: "region".into(),
            row_key: "id".into(),
            input,
            container: container.map(str::to_string),
        }
    }

    #[test]
    fn checkpoint_lives_next_to_input_blob() {
        let job = spec(
            InputLocation::Blob(BlobRef::new("uploads", "2024/orders.csv")),
            None,
        );
        assert_eq!(
            job.checkpoint_ref().unwrap(),
            BlobRef::new("uploads", "orders-info.txt")
        );
    }

    #[test]
    fn configured_container_wins_over_input_container() {
        let job = spec(
            InputLocation::Blob(BlobRef::new("uploads", "orders.csv")),
            Some("state"),
        );
        assert_eq!(job.checkpoint_ref().unwrap().container, "state");
    }

    #[test]
    fn local_file_needs_a_container() {
        let job = spec(
            InputLocation::File {
                path: "/data/orders.csv".into(),
            },
            None,
        );
        assert_eq!(job.validate(), Err(JobSpecError::MissingContainer));

        let job = spec(
            InputLocation::File {
                path: "/data/orders.csv".into(),
            },
            Some("uploads"),
        );
        assert_eq!(
            job.checkpoint_ref().unwrap(),
            BlobRef::new("uploads", "orders-info.txt")
        );
        assert_eq!(job.input_blob_name(), "orders.csv");
    }

    #[test]
    fn rejects_bad_table_names() {
        let mut job = spec(
            InputLocation::Blob(BlobRef::new("uploads", "orders.csv")),
            None,
        );
        job.table = "1orders".into();
        assert!(matches!(
            job.validate(),
            Err(JobSpecError::InvalidTableName(_))
        ));
        job.table = "or-ders".into();
        assert!(job.validate().is_err());
        job.table = "Orders2024".into();
        assert!(job.validate().is_ok());
    }

    #[test]
    fn round_trips_through_json_with_tagged_input() {
        let json = r#"{
            "account": "devstore",
            "table": "orders",
            "partition_key": "region",
            "row_key": "id",
            "input": { "type": "blob", "container": "uploads", "name": "orders.csv" }
        }"#;
        let job: JobSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            job.input,
            InputLocation::Blob(BlobRef::new("uploads", "orders.csv"))
        );
        assert_eq!(job.container, None);
    }
}
