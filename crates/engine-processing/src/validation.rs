use crate::{
    error::ConsumerError,
    keys::{KeyResolver, has_illegal_chars},
};
use connectors::file::csv::{error::FileError, source::CsvRowSource};
use engine_config::report::{
    finding::{CODE_MALFORMED_ROW, Finding, FindingKind},
    validation::ValidationReport,
};
use model::records::row::Row;
use std::{
    collections::{HashMap, HashSet},
    time::Instant,
};
use tracing::debug;

const PROGRESS_EVERY: u64 = 100_000;

/// Read-only pass that reports what an upload of the input would run into.
///
/// Rows with illegal keys are still tracked for partition spread and
/// duplicates; they are only flagged.
pub struct Validator {
    keys: KeyResolver,
    partitions: HashMap<String, HashSet<String>>,
    report: ValidationReport,
}

impl Validator {
    pub fn new(keys: KeyResolver) -> Self {
        Validator {
            keys,
            partitions: HashMap::new(),
            report: ValidationReport::new(),
        }
    }

    pub fn observe(&mut self, row: &Row) -> Result<(), ConsumerError> {
        let (pk, rk) = self.keys.extract(row)?;
        self.report.total_rows += 1;

        if has_illegal_chars(pk) || has_illegal_chars(rk) {
            self.report.illegal_keys += 1;
            self.report
                .add_finding(Finding::new_illegal_key(row.index, pk, rk));
        }

        let row_keys = self.partitions.entry(pk.to_string()).or_default();
        if !row_keys.insert(rk.to_string()) {
            self.report.duplicates += 1;
            self.report
                .add_finding(Finding::new_duplicate_key(row.index, pk, rk));
        }
        Ok(())
    }

    pub fn finish(mut self, bytes_scanned: u64, elapsed_ms: u64) -> ValidationReport {
        self.report
            .finish(self.partitions.len() as u64, bytes_scanned, elapsed_ms);
        self.report
    }

    /// Validates every remaining row of `source`.
    ///
    /// A malformed row ends the pass with an error finding; I/O failures propagate.
    pub fn run(
        source: &mut CsvRowSource,
        keys: KeyResolver,
    ) -> Result<ValidationReport, ConsumerError> {
        let started = Instant::now();
        let mut validator = Validator::new(keys);

        loop {
            let row = match source.read_row() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(FileError::MalformedRow { row, reason }) => {
                    validator.report.add_finding(
                        Finding::error(
                            CODE_MALFORMED_ROW,
                            &format!("Row {row} cannot be parsed: {reason}"),
                            FindingKind::Input,
                        )
                        .at_row(row),
                    );
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            validator.observe(&row)?;
            if validator.report.total_rows % PROGRESS_EVERY == 0 {
                debug!(
                    rows = validator.report.total_rows,
                    bytes = source.current_byte_offset(),
                    "Validation progress"
                );
            }
        }

        Ok(validator.finish(
            source.current_byte_offset(),
            started.elapsed().as_millis() as u64,
        ))
    }
}
