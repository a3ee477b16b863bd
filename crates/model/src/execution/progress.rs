use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable checkpoint of a long-running upload.
///
/// One record exists per job. It is rewritten after every committed batch and
/// periodically while scanning, and it is the only state a later run needs to
/// resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressStatus {
    /// Rows read from the input, including rows skipped for illegal keys.
    pub total_read: u64,
    /// Rows durably committed to the table store, across all sessions.
    pub total_committed: u64,
    /// Rows excluded because a key contained an illegal character.
    pub total_skipped: u64,

    /// Byte cursor into the input after the last row read.
    pub progress_bytes: u64,
    /// Length of the input in bytes.
    pub input_length: u64,

    /// Wall time spent in runs, cumulative over sessions.
    pub time_in_read_ms: u64,
    /// Part of `time_in_read_ms` spent waiting on the table store.
    pub time_in_commit_ms: u64,

    /// Resume threshold of the current session; zero for a fresh upload.
    pub start_row: u64,
    pub committed_this_session: u64,
    pub session_counter: u32,

    /// Change-detection token of the input captured when the upload began.
    pub input_fingerprint: Option<String>,
    /// Batch cap the flush sequence was built with; resume thresholds only
    /// hold under the same cap. Zero in checkpoints that predate the field.
    pub max_batch_size: usize,

    pub completed: bool,

    /// Last write time of the checkpoint blob, filled in on every read.
    #[serde(skip)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ProgressStatus {
    /// A first session over an input that has no usable checkpoint.
    pub fn fresh(fingerprint: Option<String>, input_length: u64, max_batch_size: usize) -> Self {
        ProgressStatus {
            session_counter: 1,
            input_fingerprint: fingerprint,
            input_length,
            max_batch_size,
            ..Default::default()
        }
    }

    /// Whether this checkpoint was taken against the input identified by `fingerprint`.
    pub fn matches_input(&self, fingerprint: Option<&str>) -> bool {
        self.input_fingerprint.as_deref() == fingerprint
    }

    /// Whether batch positions recorded here line up with a run capped at `max_batch_size`.
    pub fn matches_batching(&self, max_batch_size: usize) -> bool {
        self.max_batch_size == max_batch_size
    }

    /// Opens a new session on top of an interrupted one.
    ///
    /// Rows below the returned threshold are already in the table store.
    pub fn begin_resume(&mut self, input_length: u64) -> u64 {
        self.session_counter = self.session_counter.saturating_add(1);
        self.start_row = self.total_committed;
        self.committed_this_session = 0;
        self.input_length = input_length;
        self.last_modified = None;
        self.start_row
    }

    pub fn record_commit(&mut self, rows: u64) {
        self.total_committed += rows;
        self.committed_this_session += rows;
    }

    /// Records a committed batch covering positions `[end - rows, end)` of the flush sequence.
    ///
    /// A batch re-committed after a resume may overlap rows counted by an
    /// earlier session, so the committed total only moves to the batch end.
    pub fn commit_through(&mut self, end: u64, rows: u64) {
        self.total_committed = self.total_committed.max(end);
        self.committed_this_session += rows;
    }

    /// Percentage of input bytes consumed, 0 for empty inputs.
    pub fn percent_complete(&self) -> u64 {
        if self.completed {
            return 100;
        }
        if self.input_length == 0 {
            return 0;
        }
        (self.progress_bytes.min(self.input_length) * 100) / self.input_length
    }

    /// Share of run time spent in table store calls.
    pub fn commit_time_percent(&self) -> u64 {
        if self.time_in_read_ms == 0 {
            0
        } else {
            self.time_in_commit_ms * 100 / self.time_in_read_ms
        }
    }

    pub fn is_resumed(&self) -> bool {
        self.session_counter > 1
    }
}
