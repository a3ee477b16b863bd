use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FindingKind {
    Key,   // key column contents
    Input, // unreadable or malformed input
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Finding {
    pub code: String,    // stable programmatic id
    pub message: String, // human-readable
    pub severity: Severity,
    pub kind: FindingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

pub const CODE_ILLEGAL_KEY: &str = "ILLEGAL_KEY";
pub const CODE_DUPLICATE_KEY: &str = "DUPLICATE_KEY";
pub const CODE_MALFORMED_ROW: &str = "MALFORMED_ROW";

impl Finding {
    pub fn new(
        code: &str,
        message: String,
        severity: Severity,
        kind: FindingKind,
        suggestion: Option<String>,
    ) -> Self {
        Finding {
            code: code.to_string(),
            message,
            severity,
            kind,
            row: None,
            suggestion,
        }
    }

    /// A row whose partition or row key contains `\ / ? #`. Such rows are skipped on upload.
    pub fn new_illegal_key(row: u64, partition_key: &str, row_key: &str) -> Self {
        Self::new(
            CODE_ILLEGAL_KEY,
            format!(
                "Row {row} has an illegal character in its keys (partition `{partition_key}`, row `{row_key}`)"
            ),
            Severity::Warning,
            FindingKind::Key,
            Some("Remove '\\', '/', '?' and '#' from key columns; the row will be skipped.".into()),
        )
        .at_row(row)
    }

    /// A (partition key, row key) pair seen earlier in the input. The later row wins on upload.
    pub fn new_duplicate_key(row: u64, partition_key: &str, row_key: &str) -> Self {
        Self::new(
            CODE_DUPLICATE_KEY,
            format!("Row {row} repeats key (partition `{partition_key}`, row `{row_key}`)"),
            Severity::Warning,
            FindingKind::Key,
            Some("Deduplicate the input; only the last occurrence is kept.".into()),
        )
        .at_row(row)
    }

    pub fn at_row(mut self, row: u64) -> Self {
        self.row = Some(row);
        self
    }

    /// Creates a standardized error finding.
    pub fn error(code: &str, message: &str, kind: FindingKind) -> Self {
        Finding::new(code, message.to_string(), Severity::Error, kind, None)
    }
}
