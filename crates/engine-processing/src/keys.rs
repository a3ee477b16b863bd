use crate::error::ConsumerError;
use model::records::row::Row;

/// Characters the table store refuses in partition and row keys.
pub const ILLEGAL_KEY_CHARS: [char; 4] = ['\\', '/', '?', '#'];

/// Whether `key` contains an illegal character at any position.
pub fn has_illegal_chars(key: &str) -> bool {
    key.contains(ILLEGAL_KEY_CHARS)
}

/// Column positions of the partition and row keys, resolved once per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResolver {
    partition_idx: usize,
    row_idx: usize,
    partition_column: String,
    row_column: String,
}

impl KeyResolver {
    /// Matches key column names against the header, ignoring ASCII case.
    pub fn resolve(
        columns: &[String],
        partition_key: &str,
        row_key: &str,
    ) -> Result<Self, ConsumerError> {
        Ok(KeyResolver {
            partition_idx: index_of(columns, partition_key)?,
            row_idx: index_of(columns, row_key)?,
            partition_column: partition_key.to_string(),
            row_column: row_key.to_string(),
        })
    }

    pub fn partition_index(&self) -> usize {
        self.partition_idx
    }

    pub fn row_index(&self) -> usize {
        self.row_idx
    }

    pub fn is_key_column(&self, idx: usize) -> bool {
        idx == self.partition_idx || idx == self.row_idx
    }

    /// Returns `(partition_key, row_key)` of `row`.
    pub fn extract<'a>(&self, row: &'a Row) -> Result<(&'a str, &'a str), ConsumerError> {
        let pk = row
            .get(self.partition_idx)
            .ok_or_else(|| ConsumerError::MissingKeyField {
                row: row.index,
                column: self.partition_column.clone(),
            })?;
        let rk = row
            .get(self.row_idx)
            .ok_or_else(|| ConsumerError::MissingKeyField {
                row: row.index,
                column: self.row_column.clone(),
            })?;
        Ok((pk, rk))
    }
}

fn index_of(columns: &[String], name: &str) -> Result<usize, ConsumerError> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| ConsumerError::ColumnNotFound(name.to_string()))
}
