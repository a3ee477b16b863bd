use crate::file::csv::error::FileError;
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use model::records::row::Row;
use std::io::Read;

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Forward-only reader over a delimited input with a header row.
///
/// There is no seek: resuming means reading and discarding rows, because
/// record boundaries are not known from a byte offset alone.
pub struct CsvRowSource {
    reader: csv::Reader<Box<dyn Read + Send>>,
    headers: Vec<String>,
    record: StringRecord,
    total_length: u64,
    rows_read: u64,
}

impl CsvRowSource {
    /// Wraps `input` and consumes its header row.
    pub fn open(
        input: Box<dyn Read + Send>,
        total_length: u64,
        options: CsvOptions,
    ) -> Result<Self, FileError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(input);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FileError::InvalidHeader(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        // Columns are matched case-insensitively, so `Id` and `id` would collide.
        for (i, name) in headers.iter().enumerate() {
            if headers[..i].iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
                return Err(FileError::InvalidHeader(format!(
                    "duplicate column '{name}'"
                )));
            }
        }

        Ok(CsvRowSource {
            reader,
            headers,
            record: StringRecord::new(),
            total_length,
            rows_read: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// False for a zero-length input, which has neither header nor rows.
    pub fn has_header(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Reads the next row, `None` at end of input.
    pub fn read_row(&mut self) -> Result<Option<Row>, FileError> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let row = Row::new(
                    self.rows_read,
                    self.record.iter().map(str::to_string).collect(),
                );
                self.rows_read += 1;
                Ok(Some(row))
            }
            Ok(false) => Ok(None),
            Err(err) => Err(self.decode_error(err)),
        }
    }

    /// Byte offset just past the last row read.
    pub fn current_byte_offset(&self) -> u64 {
        self.reader.position().byte()
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn decode_error(&self, err: csv::Error) -> FileError {
        let row = self.rows_read;
        match err.into_kind() {
            ErrorKind::Io(e) => FileError::IoError(e),
            ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => FileError::MalformedRow {
                row,
                reason: format!("expected {expected_len} fields, found {len}"),
            },
            ErrorKind::Utf8 { err, .. } => FileError::MalformedRow {
                row,
                reason: format!("invalid UTF-8 in field {}", err.field()),
            },
            other => FileError::MalformedRow {
                row,
                reason: format!("{other:?}"),
            },
        }
    }
}
