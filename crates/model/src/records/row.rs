use serde::{Deserialize, Serialize};

/// One decoded record of the input, fields in header order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Zero-based ordinal of the record in the input, header excluded.
    pub index: u64,
    pub values: Vec<String>,
}

impl Row {
    pub fn new(index: u64, values: Vec<String>) -> Self {
        Row { index, values }
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
