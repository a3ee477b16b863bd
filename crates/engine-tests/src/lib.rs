#![allow(dead_code)]

use connectors::{
    blob::fs::FsBlobStore,
    table::{TableStore, sled_store::SledTableStore},
};
use engine_config::settings::{IngestSettings, RetrySettings};
use engine_runtime::IngestEngine;
use model::execution::job::{InputLocation, JobSpec};
use std::{
    fmt::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;

pub mod engine;
pub mod integration;
pub mod utils;

pub const TABLE: &str = "orders";
pub const CONTAINER: &str = "uploads";

/// Temp directory holding a blob store root, a sled table store and local inputs.
pub struct Harness {
    pub dir: TempDir,
    pub blobs: Arc<FsBlobStore>,
    pub tables: Arc<SledTableStore>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = Arc::new(FsBlobStore::new(dir.path().join("blobs")));
        let tables = Arc::new(SledTableStore::open(dir.path().join("tables")).expect("open sled"));
        Self { dir, blobs, tables }
    }

    /// Writes a local input file and returns its path.
    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write input");
        path
    }

    /// Job over a local file keyed by `region` / `id`.
    pub fn job(&self, path: &Path) -> JobSpec {
        JobSpec {
            account: "devstore".into(),
            table: TABLE.into(),
            partition_key: "region".into(),
            row_key: "id".into(),
            input: InputLocation::File {
                path: path.to_path_buf(),
            },
            container: Some(CONTAINER.into()),
        }
    }

    pub fn engine(&self, tables: Arc<dyn TableStore>, settings: IngestSettings) -> IngestEngine {
        IngestEngine::new(self.blobs.clone(), tables, settings).expect("valid settings")
    }

    /// Engine straight over the sled store.
    pub fn plain_engine(&self, settings: IngestSettings) -> IngestEngine {
        self.engine(self.tables.clone(), settings)
    }

    pub async fn stored_rows(&self) -> usize {
        match self.tables.scan(TABLE).await {
            Ok(entities) => entities.len(),
            Err(_) => 0,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings with a small batch cap and no retry delay.
pub fn settings(max_batch_size: usize) -> IngestSettings {
    IngestSettings {
        max_batch_size,
        retry: RetrySettings {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
        },
        ..Default::default()
    }
}

/// `rows` rows spread round-robin over `partitions` partitions with unique ids.
pub fn partitioned_csv(rows: usize, partitions: usize) -> String {
    let mut out = String::from("region,id,amount\n");
    for i in 0..rows {
        let _ = writeln!(out, "r{},{},{}", i % partitions, i, i * 10);
    }
    out
}
