use crate::{
    error::IngestError,
    execution::{
        offload::{self, QueuedJob},
        orchestrator::Orchestrator,
        source::open_input,
    },
};
use connectors::{
    blob::BlobStore, file::csv::source::CsvRowSource, queue::JobQueue, table::TableStore,
};
use engine_config::{report::validation::ValidationReport, settings::IngestSettings};
use engine_core::state::{StateStore, blob_store::BlobStateStore};
use engine_processing::{keys::KeyResolver, validation::Validator};
use model::execution::{job::JobSpec, progress::ProgressStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

/// Entry points of the ingestion engine.
///
/// Collaborators are injected so the same engine runs against local stores
/// and test doubles.
#[derive(Clone)]
pub struct IngestEngine {
    blobs: Arc<dyn BlobStore>,
    tables: Arc<dyn TableStore>,
    state: Arc<dyn StateStore>,
    settings: IngestSettings,
}

impl IngestEngine {
    /// Builds an engine that keeps checkpoints in `blobs`.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        tables: Arc<dyn TableStore>,
        settings: IngestSettings,
    ) -> Result<Self, IngestError> {
        settings.validate()?;
        let state = Arc::new(BlobStateStore::new(Arc::clone(&blobs)));
        Ok(Self {
            blobs,
            tables,
            state,
            settings,
        })
    }

    pub fn with_state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = state;
        self
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Dry run: reads the whole input and reports key problems. Writes nothing.
    pub async fn validate(&self, job: &JobSpec) -> Result<ValidationReport, IngestError> {
        let input = open_input(job, self.blobs.as_ref(), false).await?;
        let options = self.settings.csv_options();
        let partition_key = job.partition_key.clone();
        let row_key = job.row_key.clone();

        let report = tokio::task::spawn_blocking(move || -> Result<_, IngestError> {
            let mut source = CsvRowSource::open(input.reader, input.length, options)?;
            if !source.has_header() {
                let mut report = ValidationReport::new();
                report.finish(0, 0, 0);
                return Ok(report);
            }
            let keys = KeyResolver::resolve(source.headers(), &partition_key, &row_key)?;
            Ok(Validator::run(&mut source, keys)?)
        })
        .await??;

        info!(
            total_rows = report.total_rows,
            distinct_partitions = report.distinct_partitions,
            illegal_keys = report.illegal_keys,
            duplicates = report.duplicates,
            "Validation finished"
        );
        Ok(report)
    }

    /// Uploads the input, resuming from the job's checkpoint when it has one.
    ///
    /// Running it again after success returns the stored status without writing.
    pub async fn upload(
        &self,
        job: &JobSpec,
        cancel: CancellationToken,
    ) -> Result<ProgressStatus, IngestError> {
        job.validate()?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("upload", run_id = %run_id, table = %job.table);

        self.run_upload(job, &cancel).instrument(span).await
    }

    async fn run_upload(
        &self,
        job: &JobSpec,
        cancel: &CancellationToken,
    ) -> Result<ProgressStatus, IngestError> {
        info!(account = %job.account, input = %job.input_blob_name(), "Begin uploading table");
        let input = open_input(job, self.blobs.as_ref(), true).await?;
        let orchestrator = Orchestrator::new(
            Arc::clone(&self.tables),
            Arc::clone(&self.state),
            self.settings.clone(),
        );
        orchestrator.run(job, input, cancel).await
    }

    /// Reads the stored progress without touching the input.
    pub async fn status(&self, job: &JobSpec) -> Result<Option<ProgressStatus>, IngestError> {
        job.validate()?;
        Ok(self.state.load_progress(job).await?)
    }

    /// Forgets the job's progress; the next upload starts from the beginning.
    pub async fn reset(&self, job: &JobSpec) -> Result<bool, IngestError> {
        job.validate()?;
        let existed = self.state.clear_progress(job).await?;
        info!(table = %job.table, existed, "Upload state cleared");
        Ok(existed)
    }

    /// Hands the job to a remote worker through `queue`.
    pub async fn queue_job(
        &self,
        job: &JobSpec,
        queue: &dyn JobQueue,
    ) -> Result<QueuedJob, IngestError> {
        offload::queue_job(job, self.blobs.as_ref(), queue).await
    }
}
